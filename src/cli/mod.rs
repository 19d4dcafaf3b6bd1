//! Command-line parsing for the credit risk scorer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the scoring code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Profile;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "credisense",
    version,
    about = "Credit risk scoring with a pre-trained tree ensemble"
)]
pub struct Cli {
    /// Write logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive input form.
    Tui(ModelArgs),
    /// Score a single applicant record and print the risk level.
    Score(ScoreArgs),
    /// Score every row of a CSV file.
    Batch(BatchArgs),
    /// Print the feature schema for a profile.
    Schema(SchemaArgs),
    /// Load the model and verify it matches the profile.
    Check(ModelArgs),
}

/// Profile and model selection shared by every command that loads a model.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Scoring profile (schema, expansion and label table).
    #[arg(short = 'p', long, value_enum, default_value_t = Profile::Direct)]
    pub profile: Profile,

    /// Model artifact (JSON). Defaults to `CREDISENSE_MODEL`, then the profile's default path.
    #[arg(short = 'm', long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Include per-class probabilities in the output.
    #[arg(long)]
    pub probabilities: bool,
}

/// Options for scoring one record.
#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// JSON object of field -> value.
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: Option<PathBuf>,

    /// Set one field (repeatable), e.g. `--set tot_enq=3`.
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Start from the schema's documented defaults.
    #[arg(long)]
    pub defaults: bool,

    /// Print the assessment as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Options for batch scoring.
#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// CSV whose header names the schema fields.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Write results to this CSV instead of stdout.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for printing a schema.
#[derive(Debug, Args, Clone)]
pub struct SchemaArgs {
    #[arg(short = 'p', long, value_enum, default_value_t = Profile::Direct)]
    pub profile: Profile,
}
