use std::fs::{self, File};
use std::io::{self, stdout, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use threeway::aligner::{AlignerConfig, ThreewayAligner, ThreewayAlignment};
use threeway::errors::ThreewayError;
use threeway::io::{load_matrix, load_transitions, open_fasta, read_sequences, resolve_gap_penalty, write_alignment_fasta};
use threeway::scoring::{sum_of_pairs_score, GapPenalty, SubstitutionMatrix};

/// Output formats for the aligned sequences
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputType {
    /// Aligned rows as FASTA records
    Fasta,

    /// Plain aligned rows followed by the score
    Text,

    /// JSON report with rows, score, gap penalty and aligner configuration
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct CliArgs {
    /// Set verbosity level. Use multiple times to increase the verbosity level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<ThreewaySubcommand>,
}

#[derive(Subcommand, Debug)]
enum ThreewaySubcommand {
    /// Optimally align exactly three sequences
    Align(AlignArgs),

    /// Compute the sum-of-pairs score of an existing three-way alignment
    Score(ScoreArgs),

    /// Derive a linear gap penalty from an indel rate
    GapPenalty(GapPenaltyArgs),
}

#[derive(Args, Debug)]
struct GapArgs {
    /// Linear gap penalty, charged once per gap symbol (negative)
    #[arg(short, long, allow_hyphen_values = true, conflicts_with = "indel_rate")]
    #[clap(help_heading = "Gap penalty")]
    gap: Option<f64>,

    /// Derive the gap penalty from this indel rate instead. Requires --transitions.
    #[arg(short = 'r', long, requires = "transitions")]
    #[clap(help_heading = "Gap penalty")]
    indel_rate: Option<f64>,

    /// Residue transition table (CSV with a header row of symbols)
    #[arg(short, long)]
    #[clap(help_heading = "Gap penalty")]
    transitions: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AlignArgs {
    /// Three sequences to align in FASTA format, optionally gzipped
    #[clap(help_heading = "Inputs")]
    sequences: PathBuf,

    /// Substitution matrix in NCBI text format. Defaults to BLOSUM62.
    #[arg(short, long)]
    #[clap(help_heading = "Inputs")]
    matrix: Option<PathBuf>,

    /// Output filename. If not given, defaults to stdout
    #[arg(short, long)]
    #[clap(help_heading = "Outputs")]
    output: Option<PathBuf>,

    /// Output file type
    #[arg(value_enum, short = 'O', long, default_value = "fasta")]
    #[clap(help_heading = "Outputs")]
    output_type: OutputType,

    #[command(flatten)]
    gap: GapArgs,

    /// Aligner configuration as JSON. Command line options take precedence.
    #[arg(short, long)]
    #[clap(help_heading = "Alignment configuration")]
    config: Option<PathBuf>,

    /// Refuse to align if the DP cube would have more cells than this
    #[arg(long)]
    #[clap(help_heading = "Alignment configuration")]
    max_cells: Option<usize>,

    /// Keep only two score layers when the longest sequence exceeds this length...
    #[arg(long)]
    #[clap(help_heading = "Alignment configuration")]
    rolling_min_length: Option<usize>,

    /// ...and the DP cube has more cells than this
    #[arg(long)]
    #[clap(help_heading = "Alignment configuration")]
    rolling_min_cells: Option<usize>,

    /// Symbol used for gaps in the output
    #[arg(long)]
    #[clap(help_heading = "Alignment configuration")]
    gap_symbol: Option<char>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Three aligned sequences in FASTA format
    alignment: PathBuf,

    /// Substitution matrix in NCBI text format. Defaults to BLOSUM62.
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    #[command(flatten)]
    gap: GapArgs,

    /// Gap symbol used in the alignment
    #[arg(long, default_value = "-")]
    gap_symbol: char,
}

#[derive(Args, Debug)]
struct GapPenaltyArgs {
    /// Indel rate to derive the gap penalty from
    #[arg(short = 'r', long)]
    indel_rate: f64,

    /// Residue transition table (CSV with a header row of symbols)
    #[arg(short, long)]
    transitions: PathBuf,
}

#[derive(Serialize)]
struct AlignmentReport<'a> {
    names: [&'a str; 3],
    alignment: &'a ThreewayAlignment,
    gap_source: GapPenalty,
    gap: f64,
    config: &'a AlignerConfig,
}

/// Stderr logging, filtered by `RUST_LOG` or else by the verbosity flag.
fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(filter_layer);

    Registry::default().with(stderr_log).init();

    Ok(())
}

fn load_matrix_or_default(path: Option<&Path>) -> Result<SubstitutionMatrix> {
    match path {
        Some(path) => load_matrix(path)
            .with_context(|| format!("Could not load substitution matrix from {}", path.display())),
        None => Ok(SubstitutionMatrix::blosum62()),
    }
}

fn resolve_gap(gap_args: &GapArgs) -> Result<(GapPenalty, f64)> {
    let penalty = match (gap_args.gap, gap_args.indel_rate) {
        (Some(gap), _) => GapPenalty::Fixed(gap),
        (None, Some(rate)) => GapPenalty::IndelRate(rate),
        (None, None) => anyhow::bail!("Either --gap or --indel-rate must be given."),
    };

    let gap = resolve_gap_penalty(penalty, gap_args.transitions.as_deref())
        .context("Could not determine the gap penalty")?;
    info!("Using gap penalty {gap}");

    Ok((penalty, gap))
}

fn aligner_config(align_args: &AlignArgs) -> Result<AlignerConfig> {
    let mut config = if let Some(path) = &align_args.config {
        let file = File::open(path)
            .with_context(|| format!("Could not open aligner configuration {}", path.display()))?;
        serde_json::from_reader(io::BufReader::new(file))
            .with_context(|| format!("Invalid aligner configuration in {}", path.display()))?
    } else {
        AlignerConfig::default()
    };

    if let Some(max_cells) = align_args.max_cells {
        config.max_cells = Some(max_cells);
    }

    if let Some(len) = align_args.rolling_min_length {
        config.rolling_min_length = len;
    }

    if let Some(cells) = align_args.rolling_min_cells {
        config.rolling_min_cells = cells;
    }

    if let Some(symbol) = align_args.gap_symbol {
        config.gap_symbol = u8::try_from(symbol)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("Gap symbol '{symbol}' must be a single ASCII character"))?;
    }

    Ok(config)
}

fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if let Some(path) = path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?
        }

        Box::new(BufWriter::new(File::create(path)?))
    } else {
        Box::new(stdout())
    };

    Ok(writer)
}

fn write_alignment(
    writer: &mut dyn Write,
    output_type: OutputType,
    names: [&str; 3],
    alignment: &ThreewayAlignment,
    gap_source: GapPenalty,
    gap: f64,
    config: &AlignerConfig,
) -> Result<()> {
    match output_type {
        OutputType::Fasta => write_alignment_fasta(writer, names, alignment)?,
        OutputType::Text => {
            write!(writer, "{alignment}")?;
            writeln!(writer, "{}", alignment.score())?;
        },
        OutputType::Json => {
            let report = AlignmentReport { names, alignment, gap_source, gap, config };

            serde_json::to_writer_pretty(&mut *writer, &report)?;
            writeln!(writer)?;
        },
    }

    Ok(())
}

fn align_subcommand(align_args: &AlignArgs) -> Result<()> {
    let matrix = load_matrix_or_default(align_args.matrix.as_deref())?;
    let (gap_source, gap) = resolve_gap(&align_args.gap)?;
    let config = aligner_config(align_args)?;

    let mut reader = open_fasta(&align_args.sequences)
        .with_context(|| format!("Could not open {}", align_args.sequences.display()))?;
    let sequences = read_sequences(&mut reader)
        .with_context(|| format!("Could not read sequences from {}", align_args.sequences.display()))?;

    let [s1, s2, s3] = sequences.as_slice() else {
        return Err(ThreewayError::WrongRecordCount(sequences.len()).into());
    };

    info!("Aligning {} ({}), {} ({}) and {} ({})...",
          s1.name, s1.sequence.len(), s2.name, s2.sequence.len(), s3.name, s3.sequence.len());

    let aligner = ThreewayAligner::new(&matrix, config);
    let alignment = aligner.align(&s1.sequence, &s2.sequence, &s3.sequence, gap)?;

    info!("Done. Alignment score: {}, columns: {}", alignment.score(), alignment.len());

    let mut writer = create_output(align_args.output.as_deref())?;
    write_alignment(
        &mut writer,
        align_args.output_type,
        [&s1.name, &s2.name, &s3.name],
        &alignment,
        gap_source,
        gap,
        aligner.config(),
    )?;
    writer.flush()?;

    Ok(())
}

fn score_subcommand(score_args: &ScoreArgs) -> Result<()> {
    let matrix = load_matrix_or_default(score_args.matrix.as_deref())?;
    let (_, gap) = resolve_gap(&score_args.gap)?;

    let gap_symbol = u8::try_from(score_args.gap_symbol)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Gap symbol '{}' must be a single ASCII character", score_args.gap_symbol))?;

    let mut reader = open_fasta(&score_args.alignment)
        .with_context(|| format!("Could not open {}", score_args.alignment.display()))?;
    let rows = read_sequences(&mut reader)?;

    let [r1, r2, r3] = rows.as_slice() else {
        return Err(ThreewayError::WrongRecordCount(rows.len()).into());
    };

    let score = sum_of_pairs_score([&r1.sequence, &r2.sequence, &r3.sequence], gap, &matrix, gap_symbol)?;
    println!("{score}");

    Ok(())
}

fn gap_penalty_subcommand(args: &GapPenaltyArgs) -> Result<()> {
    let transitions = load_transitions(&args.transitions)
        .with_context(|| format!("Could not load transition table from {}", args.transitions.display()))?;

    let gap = threeway::compute_gap_penalty(args.indel_rate, &transitions);
    println!("{gap}");

    Ok(())
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose)?;

    match &args.command {
        Some(ThreewaySubcommand::Align(v)) => align_subcommand(v)?,
        Some(ThreewaySubcommand::Score(v)) => score_subcommand(v)?,
        Some(ThreewaySubcommand::GapPenalty(v)) => gap_penalty_subcommand(v)?,
        None => return Err(ThreewayError::Other).with_context(|| "No subcommand given.".to_string()),
    };

    Ok(())
}
