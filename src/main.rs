//! pwaff Command Line Interface
//!
//! Usage:
//!   pwaff [OPTIONS] <SCOP.json>
//!   pwaff --help
//!
//! Examples:
//!   pwaff fuse.json -s fuse.txt                # Transform and print a report
//!   pwaff fuse.json -s fuse.txt -P N=64        # Override a parameter
//!   pwaff fuse.json -s fuse.txt --emit=schedule  # Print the new schedules
//!   pwaff fuse.json -s fuse.txt --strict-labels  # Unknown labels are errors

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use pwaff::config::{TransformConfig, UnknownLabelPolicy};
use pwaff::utils::{print_schedules, print_scop, print_transform};
use pwaff::analysis::Scop;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// pwaff - legality-checked schedule transformation
#[derive(Parser, Debug)]
#[command(name = "pwaff")]
#[command(version)]
#[command(about = "Apply a directive script to a SCoP schedule", long_about = None)]
struct Cli {
    /// SCoP description (JSON)
    #[arg(value_name = "SCOP")]
    input: PathBuf,

    /// Directive script (identity transform if omitted)
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Parameter override, e.g. -P N=16
    #[arg(short = 'P', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, i64)>,

    /// Treat directives naming unknown labels as errors
    #[arg(long)]
    strict_labels: bool,

    /// Skip the dependence-preservation check
    #[arg(long)]
    no_dep_check: bool,

    /// Bound on enumerated points per set or relation
    #[arg(long, value_name = "K")]
    max_points: Option<usize>,

    /// What to emit
    #[arg(long, default_value = "report")]
    emit: EmitKind,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Pass summary (JSON)
    Report,
    /// New statement schedules
    Schedule,
    /// Cumulative schedule-space transform
    Transform,
    /// Whole region after the pass
    Scop,
}

fn parse_param(arg: &str) -> Result<(String, i64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, found `{}`", arg))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for {}: {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("pwaff v{}", pwaff::VERSION);
    debug!("Input file: {:?}", cli.input);

    let config = build_config(&cli);
    debug!("Transform config: {:?}", config);

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;
    let mut scop = Scop::from_json(&text, &config)
        .with_context(|| format!("Failed to load SCoP from {:?}", cli.input))?;

    let report = pwaff::run_on_scop(&mut scop, &config)?;
    info!("{:?}", report.status);

    let output = match cli.emit {
        EmitKind::Report => serde_json::to_string_pretty(&report.summary(&scop))?,
        EmitKind::Schedule => print_schedules(&scop),
        EmitKind::Transform => print_transform(report.transform()),
        EmitKind::Scop => print_scop(&scop),
    };
    write_output(&cli.output, &output)
}

fn build_config(cli: &Cli) -> TransformConfig {
    let mut config = TransformConfig::new()
        .with_dependence_check(!cli.no_dep_check);
    if let Some(script) = &cli.script {
        config = config.with_script(script);
    }
    if cli.strict_labels {
        config = config.with_unknown_labels(UnknownLabelPolicy::Error);
    }
    if let Some(max_points) = cli.max_points {
        config = config.with_max_points(max_points);
    }
    config.params = cli.params.iter().cloned().collect::<BTreeMap<_, _>>();
    config
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
            info!("Output written to {:?}", p);
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("N=16"), Ok(("N".to_string(), 16)));
        assert!(parse_param("N").is_err());
        assert!(parse_param("N=x").is_err());
    }

    #[test]
    fn test_build_config() {
        let cli = Cli::parse_from(["pwaff", "s.json", "-s", "t.txt", "-P", "N=4", "--strict-labels", "--no-dep-check"]);
        let config = build_config(&cli);
        assert_eq!(config.params.get("N"), Some(&4));
        assert_eq!(config.unknown_labels, UnknownLabelPolicy::Error);
        assert!(!config.check_dependences);
        assert_eq!(config.script, Some(PathBuf::from("t.txt")));
    }
}
