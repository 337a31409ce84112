//! Track Evaluation Engine
//!
//! Usage:
//!   track_eval <config.yaml> <targets.json> [--log-file <path>]
//!   track_eval --schema

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use track_eval::utils::init_logging;
use track_eval::{Calculator, EvaluationConfig, InMemoryTarget, TargetData};

const USAGE: &str = "usage: track_eval <config.yaml> <targets.json> [--log-file <path>]\n       track_eval --schema";

// ──────────────────────────────────────────────────────────────────────────────
// ARGUMENTS
// ──────────────────────────────────────────────────────────────────────────────

enum Command {
    Schema,
    Evaluate {
        config: PathBuf,
        targets: PathBuf,
        log_file: Option<PathBuf>,
    },
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut positional = Vec::new();
    let mut log_file = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" => return Ok(Command::Schema),
            "--log-file" => {
                let path = args.next().context("--log-file needs a path")?;
                log_file = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!("{}", USAGE),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [config, targets]: [PathBuf; 2] = positional
        .try_into()
        .map_err(|_| anyhow::anyhow!("{}", USAGE))?;
    Ok(Command::Evaluate { config, targets, log_file })
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let (config_path, targets_path, log_file) = match parse_args(std::env::args().skip(1))? {
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&EvaluationConfig::json_schema())?);
            return Ok(());
        }
        Command::Evaluate { config, targets, log_file } => (config, targets, log_file),
    };

    let _log_guard = init_logging(log_file.as_deref()).context("Failed to initialize logging")?;

    let config = EvaluationConfig::from_path(&config_path)
        .with_context(|| format!("Failed to load config {:?}", config_path))?;

    let content = std::fs::read_to_string(&targets_path)
        .with_context(|| format!("Failed to read targets {:?}", targets_path))?;
    let targets: Vec<InMemoryTarget> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse targets {:?}", targets_path))?;
    info!("Loaded {} targets from {:?}", targets.len(), targets_path);

    let targets: Vec<Arc<dyn TargetData>> = targets
        .into_iter()
        .map(|t| Arc::new(t) as Arc<dyn TargetData>)
        .collect();

    let mut calculator = Calculator::new(config)?;
    let report = calculator.evaluate(&targets);
    println!("{}", report.to_json()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert!(matches!(parse_args(args(&["--schema"])).unwrap(), Command::Schema));

        match parse_args(args(&["cfg.yaml", "t.json", "--log-file", "run.log"])).unwrap() {
            Command::Evaluate { config, targets, log_file } => {
                assert_eq!(config, PathBuf::from("cfg.yaml"));
                assert_eq!(targets, PathBuf::from("t.json"));
                assert_eq!(log_file, Some(PathBuf::from("run.log")));
            }
            Command::Schema => panic!("expected evaluate"),
        }

        assert!(parse_args(args(&["cfg.yaml"])).is_err());
        assert!(parse_args(args(&["cfg.yaml", "t.json", "--log-file"])).is_err());
    }
}
