/// Text canonicalization applied before any comparison
///
/// Implementations must be deterministic and idempotent. The matcher relies on
/// normalization being character-wise, so that normalizing segments one by one
/// and concatenating gives the same text as normalizing the concatenation.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// Arabic normalizer: strips tashkeel and folds common letter variants
#[derive(Debug, Clone, Copy, Default)]
pub struct ArabicNormalizer;

impl Normalizer for ArabicNormalizer {
    fn normalize(&self, text: &str) -> String {
        normalize_arabic(text)
    }
}

/// Leaves text untouched; useful for non-Arabic corpora and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl Normalizer for IdentityNormalizer {
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Normalize Arabic text for comparison
///
/// 1. Removes diacritics (U+0617-U+061A, U+064B-U+0652, U+0670, U+06D6-U+06ED)
/// 2. Folds alef variants to bare alef
/// 3. Folds alef maqsura and yeh with hamza to yeh, waw with hamza to waw
/// 4. Folds teh marbuta to heh
pub fn normalize_arabic(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_diacritic(c))
        .map(fold_letter)
        .collect()
}

fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{0617}'..='\u{061A}'
        | '\u{064B}'..='\u{0652}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06ED}')
}

fn fold_letter(c: char) -> char {
    match c {
        'إ' | 'أ' | 'آ' => 'ا',
        'ى' | 'ئ' => 'ي',
        'ؤ' => 'و',
        'ة' => 'ه',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize_arabic("بِسْمِ اللَّهِ"), "بسم الله");
    }

    #[test]
    fn test_folds_letter_variants() {
        assert_eq!(normalize_arabic("أإآا"), "اااا");
        assert_eq!(normalize_arabic("هدى"), "هدي");
        assert_eq!(normalize_arabic("مؤمن"), "مومن");
        assert_eq!(normalize_arabic("شيئ"), "شيي");
        assert_eq!(normalize_arabic("رحمة"), "رحمه");
    }

    #[test]
    fn test_idempotent() {
        let text = "الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ ۝ إِيَّاكَ نَعْبُدُ";
        let once = normalize_arabic(text);
        assert_eq!(normalize_arabic(&once), once);
    }

    #[test]
    fn test_character_wise() {
        let a = "قُلْ هُوَ";
        let b = " اللَّهُ أَحَدٌ";
        let joined = format!("{a}{b}");
        assert_eq!(
            format!("{}{}", normalize_arabic(a), normalize_arabic(b)),
            normalize_arabic(&joined)
        );
    }

    #[test]
    fn test_leaves_latin_alone() {
        assert_eq!(normalize_arabic("hello world"), "hello world");
        assert_eq!(IdentityNormalizer.normalize("أ"), "أ");
    }
}
