use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use divseq::{ProfileConfig, UnseenContextPolicy};
use simplelog::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: CliCommands,
}

#[derive(Subcommand)]
pub enum CliCommands {
    /// Scan a genome and store its k-mer profile.
    CreateProfile(CreateProfileCommand),

    /// Generate sequences that diverge from (or resemble) a genome.
    Generate(GenerateCommand),
}

#[derive(Args)]
pub struct CreateProfileCommand {
    /// The genome in FASTA format, optionally gzip-compressed.
    #[arg(long)]
    pub fasta: PathBuf,

    /// The file the profile is written to.
    #[arg(long)]
    pub output: PathBuf,

    /// The number of threads used to count k-mers.
    #[arg(long)]
    pub threads: Option<usize>,

    #[command(flatten)]
    pub profile: ProfileArguments,
}

#[derive(Args)]
pub struct GenerateCommand {
    /// The genome in FASTA format, optionally gzip-compressed.
    #[arg(long, conflicts_with = "profile", required_unless_present = "profile")]
    pub fasta: Option<PathBuf>,

    /// A profile written by `create-profile`.
    /// The profile options below are ignored in this case.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// The length of each generated sequence.
    #[arg(long, default_value_t = 1000)]
    pub seq_len: usize,

    /// The number of generated sequences.
    #[arg(long, default_value_t = 100)]
    pub n_seq: usize,

    /// Also generate control sequences that only match the GC content,
    /// and print the scores of both kinds.
    #[arg(long)]
    pub comp_seq: bool,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// The number of threads. By default all available cores are used.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Write the sequences to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub profile_arguments: ProfileArguments,
}

#[derive(Args)]
pub struct ProfileArguments {
    /// The word length of the profile.
    #[arg(long, default_value_t = 8)]
    pub kmer_size: usize,

    /// How strongly the GC content of generated sequences is steered towards the genome.
    #[arg(long, default_value_t = 1.0)]
    pub gc_weight: f64,

    /// Use this GC fraction instead of the one of the genome.
    #[arg(long)]
    pub fixed_gc: Option<f64>,

    /// Generate sequences that resemble the genome instead of diverging from it.
    #[arg(long)]
    pub similar: bool,

    /// What to do with contexts that never occur in the genome.
    #[arg(long, value_enum, default_value_t = UnseenContextPolicy::Uniform)]
    pub unseen_context: UnseenContextPolicy,
}

impl From<&ProfileArguments> for ProfileConfig {
    fn from(arguments: &ProfileArguments) -> Self {
        Self {
            k: arguments.kmer_size,
            gc_weight: arguments.gc_weight,
            similar: arguments.similar,
            fixed_gc: arguments.fixed_gc,
            unseen_context_policy: arguments.unseen_context,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}
