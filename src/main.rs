use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ayat::io::read_segment_lines;
use ayat::matching::{ConsumeOutcome, SessionObserver, SessionProgress};
use ayat::speaker::DEFAULT_TOP_SPEAKERS;
use ayat::{
    load_corpus, load_segments, rank_index, run_stream, top_predictions, CandidateIndex,
    EngineConfig, MatchReport, MatchSession, PreambleConfig, RankConfig, RankReport, ScoreTable,
    SessionOutcome, SpeakerClassifier, TracingObserver, WindowConfig,
};

#[derive(Parser)]
#[command(name = "ayat")]
#[command(author, version, about = "Identify recited verses from transcribed audio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a transcript incrementally, stopping once a verse is recognized
    Detect {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[command(flatten)]
        engine: EngineArgs,

        /// Transcript segments (JSON array or transcription document)
        #[arg(short, long)]
        segments: PathBuf,

        /// Output file for the machine-readable report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Match segments streamed as JSON Lines on stdin
    Stream {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[command(flatten)]
        engine: EngineArgs,

        /// Output file for the machine-readable report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank every candidate window against the full transcript
    Rank {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Transcript segments (JSON array or transcription document)
        #[arg(short, long)]
        segments: PathBuf,

        /// Number of matches to report
        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Remove isti'adha and basmala from the transcript before scoring
        #[arg(long)]
        strip_preamble: bool,

        /// Output file for the machine-readable report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show corpus statistics and candidate counts
    Inspect {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

#[derive(Args)]
struct CorpusArgs {
    /// Verse corpus (JSON)
    #[arg(short, long)]
    corpus: PathBuf,

    /// Window sizes in verses, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5")]
    window_sizes: Vec<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct EngineArgs {
    /// Single-verse score that stops the search
    #[arg(long, default_value = "0.60")]
    score_high: f64,

    /// Score two adjacent verses must both reach to stop the search
    #[arg(long, default_value = "0.35")]
    score_medium: f64,

    /// Score every segment against every candidate
    #[arg(long)]
    no_early_stop: bool,

    /// Remove isti'adha and basmala from the transcript before scoring
    #[arg(long)]
    strip_preamble: bool,

    /// Precomputed reciter scores per chapter (JSON)
    #[arg(long)]
    speaker_scores: Option<PathBuf>,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            score_high: self.score_high,
            score_medium: self.score_medium,
            early_stop: !self.no_early_stop,
            preamble: preamble_config(self.strip_preamble),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            corpus,
            engine,
            segments,
            output,
        } => {
            setup_logging(corpus.verbose);
            detect(&corpus, &engine, segments, output)
        }
        Commands::Stream {
            corpus,
            engine,
            output,
        } => {
            setup_logging(corpus.verbose);
            stream(&corpus, &engine, output).await
        }
        Commands::Rank {
            corpus,
            segments,
            top_k,
            strip_preamble,
            output,
        } => {
            setup_logging(corpus.verbose);
            rank(&corpus, segments, top_k, strip_preamble, output)
        }
        Commands::Inspect { corpus } => {
            setup_logging(corpus.verbose);
            inspect(&corpus)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_env_var("AYAT_LOG")
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn preamble_config(strip: bool) -> PreambleConfig {
    PreambleConfig {
        enabled: strip,
        ..Default::default()
    }
}

fn build_index(args: &CorpusArgs) -> Result<Arc<CandidateIndex>> {
    info!("Loading corpus from {:?}", args.corpus);
    let corpus = load_corpus(&args.corpus).context("Failed to load verse corpus")?;
    info!(
        "Loaded {} chapters, {} verses",
        corpus.chapters.len(),
        corpus.verse_count()
    );

    let window_config = WindowConfig::new(args.window_sizes.clone());
    if window_config.effective_sizes().len() != args.window_sizes.len() {
        warn!(
            "Ignoring zero or repeated window sizes in {:?}",
            args.window_sizes
        );
    }
    Ok(Arc::new(CandidateIndex::build(&corpus, &window_config)))
}

/// Progress bar advanced once per consumed segment
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: u64) -> Result<Self> {
        let bar = ProgressBar::new(total);
        bar.set_style(ProgressStyle::with_template(
            "Analysing {bar:40.magenta/blue} {percent:>3}% {elapsed}",
        )?);
        Ok(Self { bar })
    }
}

impl SessionObserver for ProgressObserver {
    fn on_progress(&mut self, progress: &SessionProgress) {
        if let ConsumeOutcome::Stopped(_) = progress.outcome {
            if let Some(total) = self.bar.length() {
                self.bar.set_position(total);
            }
            self.bar.finish_and_clear();
        } else {
            self.bar.inc(1);
        }
    }
}

fn detect(
    corpus: &CorpusArgs,
    engine: &EngineArgs,
    segments: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let index = build_index(corpus)?;
    info!("Loading transcript segments from {:?}", segments);
    let segments = load_segments(&segments).context("Failed to load transcript segments")?;
    info!("Loaded {} segments", segments.len());

    let progress = ProgressObserver::new(segments.len() as u64)?;
    let bar = progress.bar.clone();
    let mut session = MatchSession::new(index, engine.config())
        .with_observer(progress)
        .with_observer(TracingObserver);
    session.consume_all(&segments)?;
    bar.finish_and_clear();

    report(session.finalize(), engine, output)
}

async fn stream(corpus: &CorpusArgs, engine: &EngineArgs, output: Option<PathBuf>) -> Result<()> {
    let index = build_index(corpus)?;
    let session = MatchSession::new(index, engine.config()).with_observer(TracingObserver);
    let (tx, rx) = mpsc::channel(32);

    let stdin = BufReader::new(tokio::io::stdin());
    let producer = tokio::spawn(read_segment_lines(stdin, tx));

    info!("Waiting for segments on stdin...");
    let outcome = run_stream(session, rx).await?;
    if outcome.terminated {
        // Stdin may still be open; the reader would block until it closes
        producer.abort();
    } else {
        producer.await.context("Segment reader task failed")??;
    }

    report(outcome, engine, output)
}

fn rank(
    corpus: &CorpusArgs,
    segments: PathBuf,
    top_k: usize,
    strip_preamble: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let index = build_index(corpus)?;
    let segments = load_segments(&segments).context("Failed to load transcript segments")?;
    let transcript: String = segments.iter().map(|s| s.text.as_str()).collect();

    let config = RankConfig {
        top_k,
        preamble: preamble_config(strip_preamble),
    };
    let report = RankReport {
        top_k,
        matches: rank_index(&index, &transcript, &config),
    };

    print!("{}", report.format());
    if let Some(path) = output {
        report.write_json(&path)?;
        info!("Report written to {:?}", path);
    }
    Ok(())
}

fn report(outcome: SessionOutcome, engine: &EngineArgs, output: Option<PathBuf>) -> Result<()> {
    let speakers = match (&outcome.best_match, &engine.speaker_scores) {
        (Some(best), Some(path)) => {
            let table = ScoreTable::from_file(path)?;
            let predictions = table.predict(best.chapter_id)?;
            if predictions.is_empty() {
                warn!("No reciter scores for chapter {}", best.chapter_id);
            }
            top_predictions(predictions, DEFAULT_TOP_SPEAKERS)
        }
        _ => Vec::new(),
    };

    let report = MatchReport::from_outcome(outcome, speakers);
    print!("{}", report.format());
    if let Some(path) = output {
        report.write_json(&path)?;
        info!("Report written to {:?}", path);
    }
    Ok(())
}

fn inspect(corpus: &CorpusArgs) -> Result<()> {
    let index = build_index(corpus)?;
    let chapters: Vec<u32> = {
        let mut ids: Vec<u32> = index.candidates().iter().map(|c| c.chapter_id).collect();
        ids.dedup();
        ids
    };

    println!("Corpus Analysis");
    println!("===============");
    println!("Verses: {}", index.verse_slot_count());
    println!("Window sizes: {:?}", index.window_sizes());
    println!("Candidate windows: {}", index.len());
    println!("Chapters with candidates: {}", chapters.len());
    println!("Corpus version: {:016x}", index.corpus_version());
    println!();

    println!("Windows per size");
    println!("----------------");
    for &w in index.window_sizes() {
        let count = index.candidates().iter().filter(|c| c.len() == w).count();
        println!("{} verse(s): {}", w, count);
    }

    Ok(())
}
