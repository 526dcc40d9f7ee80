//! enumcheck CLI - EnumMap/EnumSet opportunity detector for compiled Java
//! class trees.
//!
//! Features:
//! - Recursive .class discovery with directory pruning
//! - Rayon-powered parallel per-class analysis
//! - Incremental caching for faster re-analysis
//! - Plain and JSON reports
//! - Optional enumcheck.toml configuration

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use enumcheck_core::{
    init_structured_logging, load_config, print_json, print_plain, Enumcheck, EnumcheckConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "EnumMap/EnumSet opportunity detector for JVM class files")]
pub struct Cli {
    /// Path to the root of the compiled class tree
    #[arg(default_value = ".")]
    path: String,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Class names or patterns to ignore
    #[arg(long, num_args = 1..)]
    ignore: Vec<String>,

    /// Directory names to exclude from scanning
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,

    /// Disable the incremental analysis cache
    #[arg(long)]
    no_cache: bool,

    /// List key types that could not be resolved during analysis
    #[arg(long)]
    show_missing: bool,

    /// Verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    init_structured_logging();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Runs the analysis; returns whether any findings were reported.
fn run(cli: Cli) -> Result<bool> {
    let root = PathBuf::from(&cli.path);
    if !root.exists() {
        bail!("path does not exist: {}", root.display());
    }

    // Config file problems degrade to defaults; the scan still runs
    let config: Option<EnumcheckConfig> = match load_config(&root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[WARN] {:#}", e);
            None
        }
    };

    let mut ignore = cli.ignore.clone();
    if let Some(extra) = config.as_ref().and_then(|c| c.ignore.as_ref()) {
        ignore.extend(extra.iter().cloned());
    }

    let json = cli.json
        || config
            .as_ref()
            .and_then(|c| c.output.as_ref())
            .and_then(|o| o.format.as_deref())
            == Some("json");

    let result = Enumcheck::new(&root)
        .with_cache(!cli.no_cache)
        .ignore_patterns(ignore)
        .exclude_dirs(cli.exclude.iter().cloned())
        .verbose(cli.verbose)
        .analyze()
        .context("Analysis failed")?;

    if json {
        print_json(&result.findings);
    } else {
        print_plain(&result.findings);
        println!(
            "Scanned {} classes ({} from cache, {} unreadable).",
            result.total_classes, result.cached_classes, result.malformed_files
        );
    }

    if cli.show_missing && !result.missing_classes.is_empty() {
        eprintln!("Unresolved key types ({}):", result.missing_classes.len());
        for class in &result.missing_classes {
            eprintln!("- {}", class);
        }
    }

    Ok(result.has_findings())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "enumcheck",
            "build/classes",
            "--json",
            "--ignore",
            "com/generated/*",
            "--no-cache",
        ])
        .unwrap();
        assert_eq!(cli.path, "build/classes");
        assert!(cli.json);
        assert!(cli.no_cache);
        assert_eq!(cli.ignore, vec!["com/generated/*".to_string()]);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let cli = Cli::try_parse_from(["enumcheck", "/definitely/not/here"]).unwrap();
        assert!(run(cli).is_err());
    }
}
