//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - loads the model once and binds it to the selected profile
//! - dispatches to the interactive form or the one-shot commands

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Command, ModelArgs, ScoreArgs};
use crate::domain::{FeatureRecord, Profile, RunConfig};
use crate::error::AppError;
use crate::models::{Classifier, ModelAdapter};

pub mod pipeline;

use pipeline::Pipeline;

/// Environment variable overriding the profile's default model path.
pub const MODEL_ENV: &str = "CREDISENSE_MODEL";

/// Entry point for the `credisense` binary.
pub fn run() -> Result<(), AppError> {
    // `credisense` with no subcommand opens the form, like `credisense tui`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    init_logging(cli.log_file.as_deref(), interactive)?;

    match cli.command {
        Command::Tui(args) => handle_tui(&args),
        Command::Score(args) => handle_score(&args),
        Command::Batch(args) => handle_batch(&args),
        Command::Schema(args) => {
            print!("{}", crate::report::format_schema(args.profile));
            Ok(())
        }
        Command::Check(args) => handle_check(&args),
    }
}

/// Install the global `tracing` subscriber.
///
/// Filter comes from `RUST_LOG` (default `credisense=info`). The form owns the
/// terminal, so without `--log-file` it runs with logging off.
pub fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "credisense=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(2, format!("Failed to create log file '{}': {e}", path.display()))
            })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None if interactive => return Ok(()),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = result;
    Ok(())
}

/// Resolve the run configuration from CLI flags, `.env` and profile defaults.
pub fn config_from_args(args: &ModelArgs) -> RunConfig {
    dotenvy::dotenv().ok();
    let env_model = std::env::var(MODEL_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    RunConfig {
        profile: args.profile,
        model_path: resolve_model_path(args.profile, args.model.clone(), env_model),
        probabilities: args.probabilities,
    }
}

/// Precedence: explicit flag, then environment, then the profile default.
pub fn resolve_model_path(
    profile: Profile,
    flag: Option<PathBuf>,
    env: Option<PathBuf>,
) -> PathBuf {
    flag.or(env).unwrap_or_else(|| profile.default_model_path())
}

fn load_adapter(config: &RunConfig) -> ModelAdapter {
    info!(
        profile = config.profile.tag(),
        path = %config.model_path.display(),
        "loading model"
    );
    ModelAdapter::load(&config.model_path)
}

fn handle_tui(args: &ModelArgs) -> Result<(), AppError> {
    let config = config_from_args(args);
    crate::tui::run(config)
}

fn handle_score(args: &ScoreArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.model);
    let record = collect_record(args, config.profile)?;

    let violations = crate::features::validate_ranges(&record, config.profile.schema());
    if !violations.is_empty() {
        let lines: Vec<String> = violations.iter().map(|v| format!("  {v}")).collect();
        return Err(AppError::new(
            2,
            format!("Input values out of range:\n{}", lines.join("\n")),
        ));
    }

    let adapter = load_adapter(&config);
    if let Some(err) = adapter.load_error() {
        eprintln!("{err}");
    }
    let pipeline = Pipeline::new(config.profile, &adapter)?;
    let assessment = pipeline.score(&record, config.probabilities)?;

    if args.json {
        let json = serde_json::to_string_pretty(&assessment)
            .map_err(|e| AppError::new(4, format!("Failed to encode result JSON: {e}")))?;
        println!("{json}");
    } else {
        print!(
            "{}",
            crate::report::format_record(&record, config.profile.schema())
        );
        println!();
        print!("{}", crate::report::format_assessment(&assessment));
    }
    Ok(())
}

/// Build the record for `score`: defaults, then `--input`, then `--set`.
fn collect_record(args: &ScoreArgs, profile: Profile) -> Result<FeatureRecord, AppError> {
    let mut record = if args.defaults {
        FeatureRecord::defaults(profile.schema())
    } else {
        FeatureRecord::new()
    };
    if let Some(path) = &args.input {
        for (name, value) in crate::io::read_record_json(path)?.iter() {
            record.set(name.clone(), value.clone());
        }
    }
    for assignment in &args.set {
        let (name, value) = crate::io::parse_assignment(assignment)?;
        if profile.schema().field(&name).is_none() {
            warn!(field = %name, profile = profile.tag(), "ignoring field not in schema");
        }
        record.set(name, value);
    }
    Ok(record)
}

fn handle_batch(args: &BatchArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.model);
    let input = crate::io::read_batch_csv(&args.input)?;
    for e in &input.row_errors {
        warn!(line = e.line, "{}", e.message);
    }

    let adapter = load_adapter(&config);
    if let Some(err) = adapter.load_error() {
        // Every row would fail the same way; report once and stop.
        return Err(AppError::new(4, err.to_string()));
    }
    let pipeline = Pipeline::new(config.profile, &adapter)?;

    let scored = pipeline::score_batch(&pipeline, &input.rows, config.probabilities);
    let failed = scored.iter().filter(|r| r.outcome.is_err()).count();
    info!(
        rows = scored.len(),
        failed,
        unreadable = input.row_errors.len(),
        "batch scored"
    );

    let probability_labels: Vec<i64> = match adapter.classifier() {
        Some(model) if config.probabilities => model.classes().to_vec(),
        _ => Vec::new(),
    };
    let now = chrono::Utc::now();
    match &args.output {
        Some(path) => crate::io::write_results_csv(
            path,
            &scored,
            config.profile,
            now,
            &probability_labels,
        )?,
        None => crate::io::write_results(
            std::io::stdout().lock(),
            &scored,
            config.profile,
            now,
            &probability_labels,
        )?,
    }
    Ok(())
}

fn handle_check(args: &ModelArgs) -> Result<(), AppError> {
    let config = config_from_args(args);
    let adapter = load_adapter(&config);
    if let Some(err) = adapter.load_error() {
        return Err(AppError::new(4, err.to_string()));
    }
    let pipeline = Pipeline::new(config.profile, &adapter)?;

    println!("profile: {}", config.profile.display_name());
    println!("{}", crate::report::format_model_status(&adapter));

    let defaults = FeatureRecord::defaults(config.profile.schema());
    let assessment = pipeline.score(&defaults, false)?;
    println!(
        "defaults -> {} ({}), severity {}",
        assessment.label, assessment.category, assessment.severity
    );
    Ok(())
}

/// Rewrite argv so `credisense` defaults to `credisense tui`.
///
/// Rules:
/// - `credisense`                      -> `credisense tui`
/// - `credisense -p expanded ...`      -> `credisense tui -p expanded ...`
/// - `credisense --help/--version/-h`  -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = |s: &str| matches!(s, "tui" | "score" | "batch" | "schema" | "check");
    if is_subcommand(&arg1) {
        return argv;
    }

    // A global `--log-file` may come before the subcommand.
    let after_log_file = if arg1 == "--log-file" {
        argv.get(3)
    } else if arg1.starts_with("--log-file=") {
        argv.get(2)
    } else {
        None
    };
    if after_log_file.is_some_and(|s| is_subcommand(s.as_str())) {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_form() {
        assert_eq!(rewrite_args(argv(&["credisense"])), argv(&["credisense", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["credisense", "-p", "expanded"])),
            argv(&["credisense", "tui", "-p", "expanded"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "--help"])),
            argv(&["credisense", "--help"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "score", "--defaults"])),
            argv(&["credisense", "score", "--defaults"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "--log-file", "run.log", "check"])),
            argv(&["credisense", "--log-file", "run.log", "check"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "--log-file", "run.log"])),
            argv(&["credisense", "tui", "--log-file", "run.log"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "--log-file=run.log", "check"])),
            argv(&["credisense", "--log-file=run.log", "check"])
        );
        assert_eq!(
            rewrite_args(argv(&["credisense", "--log-file=run.log", "-p", "expanded"])),
            argv(&["credisense", "tui", "--log-file=run.log", "-p", "expanded"])
        );
    }

    #[test]
    fn model_path_precedence() {
        let flag = Some(PathBuf::from("flag.json"));
        let env = Some(PathBuf::from("env.json"));
        assert_eq!(
            resolve_model_path(Profile::Direct, flag.clone(), env.clone()),
            PathBuf::from("flag.json")
        );
        assert_eq!(
            resolve_model_path(Profile::Direct, None, env),
            PathBuf::from("env.json")
        );
        assert_eq!(
            resolve_model_path(Profile::Expanded, None, None),
            PathBuf::from("models").join("model.json")
        );
    }
}
