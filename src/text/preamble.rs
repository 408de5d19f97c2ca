use super::Normalizer;

/// Phrases commonly recited before the verses themselves
pub const DEFAULT_PREAMBLES: [&str; 3] = [
    "أعوذ بالله من الشيطان الرجيم",
    "بسم الله الرحمن الرحيم",
    "بسم الله الرحمن الر حيم",
];

/// Configuration for preamble removal
#[derive(Debug, Clone)]
pub struct PreambleConfig {
    /// Remove preambles from the transcript before scoring
    pub enabled: bool,
    /// Phrases to remove, in removal order
    pub phrases: Vec<String>,
}

impl Default for PreambleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phrases: DEFAULT_PREAMBLES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl PreambleConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Removes preamble phrases (isti'adha, basmala) from normalized transcripts
#[derive(Debug, Clone, Default)]
pub struct PreambleCleaner {
    phrases: Vec<String>,
}

impl PreambleCleaner {
    /// Build a cleaner whose phrases are normalized with the given normalizer
    ///
    /// A disabled config yields a cleaner that only trims.
    pub fn new(config: &PreambleConfig, normalizer: &dyn Normalizer) -> Self {
        if !config.enabled {
            return Self::default();
        }
        let phrases = config
            .phrases
            .iter()
            .map(|p| normalizer.normalize(p))
            .filter(|p| !p.trim().is_empty())
            .collect();
        Self { phrases }
    }

    pub fn is_active(&self) -> bool {
        !self.phrases.is_empty()
    }

    /// Remove every occurrence of each phrase, then trim
    pub fn clean(&self, normalized: &str) -> String {
        let mut text = normalized.to_string();
        for phrase in &self.phrases {
            if text.contains(phrase.as_str()) {
                text = text.replace(phrase.as_str(), "");
            }
        }
        text.trim().to_string()
    }
}
