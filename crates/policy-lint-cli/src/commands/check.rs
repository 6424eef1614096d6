//! Check command implementation.

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use policy_lint_core::{Config, Engine, EditScript};
use policy_lint_rules::{build_rules, rule_by_name};
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Suffix of syntax tree dumps picked up from directories.
const DUMP_SUFFIX: &str = ".ast.json";

/// Arguments of the check command.
#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Dumps or directories of dumps to analyze (default: current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Only run specific rules (comma-separated names or codes)
    #[arg(long)]
    rules: Option<String>,

    /// Exclude path patterns (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Produce rewrites from rewrite-capable rules
    #[arg(long)]
    rewrite: bool,

    /// Write the edit script to a file (`.json` for JSON); implies --rewrite
    #[arg(long, value_name = "FILE")]
    edits: Option<PathBuf>,

    /// Number of units analyzed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,
}

/// Runs the check command. Returns true if an error-severity diagnostic
/// was reported.
pub fn run(args: &CheckArgs, source: &ConfigSource) -> Result<bool> {
    let mut config = load_config(source)?;

    let mut enable_only = Vec::new();
    if let Some(filter) = &args.rules {
        // Filtered runs pick from every rule, not just the preset.
        config.preset = Some("all".to_string());
        for id in filter.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match rule_by_name(id) {
                Some(rule) => enable_only.push(rule.name().to_string()),
                None => enable_only.push(id.to_string()),
            }
        }
    }

    let mut builder = Engine::builder()
        .rules(build_rules(&config))
        .config(config)
        .enable_only(enable_only);
    for pattern in &args.exclude {
        builder = builder.exclude(pattern.clone());
    }
    if args.rewrite || args.edits.is_some() {
        builder = builder.rewrite(true);
    }
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }
    let engine = builder.build().context("Failed to build engine")?;

    let units = collect_units(&args.paths)?;
    if units.is_empty() {
        tracing::warn!("No {DUMP_SUFFIX} files found");
    }

    let report = engine.run_units(&units);
    let script = engine.rewrite_enabled().then(|| report.edit_script());

    match (&args.edits, &script) {
        (Some(path), Some(script)) => {
            write_edits(path, script)?;
            super::output::print(&report, None, args.format)?;
        }
        _ => super::output::print(&report, script.as_ref(), args.format)?,
    }

    Ok(report.has_errors())
}

fn load_config(source: &ConfigSource) -> Result<Config> {
    match source {
        ConfigSource::Default => Ok(Config::default()),
        other => {
            // Invariant: non-Default variants always have a path
            let p = other.path().context("resolved config has no path")?;
            if source.is_global() {
                tracing::info!("Using global config: {}", p.display());
            }
            Config::from_file(p).with_context(|| format!("Failed to load config: {}", p.display()))
        }
    }
}

/// Expands the command-line paths into dump files, sorted within each
/// directory.
fn collect_units(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut units = Vec::new();
    for path in paths {
        if path.is_file() {
            units.push(path.clone());
        } else if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkBuilder::new(path).build() {
                let entry =
                    entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if is_dump(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            units.extend(found);
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(units)
}

fn is_dump(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(DUMP_SUFFIX))
}

fn write_edits(path: &Path, script: &EditScript) -> Result<()> {
    let content = if path.extension().is_some_and(|e| e == "json") {
        serde_json::to_string_pretty(script)?
    } else {
        script.render()
    };
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write edits: {}", path.display()))?;
    tracing::info!(
        "Wrote {} edit(s) to {} ({} conflict(s) dropped)",
        script.edits.len(),
        path.display(),
        script.conflicts
    );
    Ok(())
}
