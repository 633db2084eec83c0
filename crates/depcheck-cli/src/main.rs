use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use depcheck_config::DepcheckConfig;
use depcheck_core::{run_check, CheckOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depcheck", version, about = "Check OSGi dependency ranges against the methods a bundle calls")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every declared dependency range of a bundle
    Check(CheckArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Bundle jar or class directory with `META-INF/MANIFEST.MF`
    artifact: PathBuf,
    /// Directory of dependency bundles (repeatable)
    #[arg(long = "repository", value_name = "DIR")]
    repositories: Vec<PathBuf>,
    /// Config file (defaults to `depcheck.toml` in the current directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// JDK used to resolve platform classes
    #[arg(long, value_name = "DIR")]
    jdk_home: Option<PathBuf>,
    /// Show method descriptors and every problem
    #[arg(long)]
    verbose: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
    /// Write a Markdown report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
    /// Raise declared range floors to the suggested versions
    #[arg(long)]
    apply_suggestions: bool,
    /// Manifest to rewrite with `--apply-suggestions`
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Exit successfully even when problems are found
    #[arg(long)]
    no_fail: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Check(args) => check(args),
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<DepcheckConfig> {
    if let Some(path) = explicit {
        return DepcheckConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let cwd = std::env::current_dir().context("failed to determine the current directory")?;
    let (config, _) = depcheck_config::load_for_dir(&cwd)?;
    Ok(config)
}

fn check(args: CheckArgs) -> Result<i32> {
    let config = load_config(args.config.as_ref())?;
    depcheck_config::init_tracing(&config.logging);

    let mut repositories = config.repositories.clone();
    repositories.extend(args.repositories);
    let options = CheckOptions {
        artifact: args.artifact,
        repositories,
        jdk_home: args.jdk_home.or(config.jdk.home.clone()),
        verbose: args.verbose || config.check.verbose,
        apply_suggestions: args.apply_suggestions || config.check.apply_suggestions,
        manifest: args.manifest,
    };

    let outcome = run_check(&options)
        .with_context(|| format!("failed to check {}", options.artifact.display()))?;
    let report = &outcome.report;

    if let Some(path) = args.report.as_ref().or(config.check.report.as_ref()) {
        report
            .write_markdown(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!(report = %path.display(), "wrote report");
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else if report.is_clean() {
        println!("depcheck: no problems found");
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    if let Some(path) = &outcome.manifest_updated {
        eprintln!("depcheck: updated {}", path.display());
    }

    let fail = config.check.fail_on_problems && !args.no_fail;
    Ok(if fail && !report.is_clean() { 1 } else { 0 })
}
