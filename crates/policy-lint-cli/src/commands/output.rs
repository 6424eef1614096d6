//! Shared output formatting for lint results.

use anyhow::Result;
use policy_lint_core::{EditScript, RunReport, Severity};
use std::fmt::Write;

use crate::OutputFormat;

/// Print lint results in the specified format.
///
/// `script` is printed after the diagnostics when rewrites were requested
/// but not written to a file.
pub fn print(
    report: &RunReport,
    script: Option<&EditScript>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_text(report);
            if let Some(script) = script {
                print!("{}", script.render());
            }
        }
        OutputFormat::Json => println!("{}", render_json(report, script)?),
        OutputFormat::Compact => {
            print!("{}", render_compact(report));
            if let Some(script) = script {
                print!("{}", script.render());
            }
        }
    }
    Ok(())
}

fn print_text(report: &RunReport) {
    let (errors, warnings, infos) = report.count_by_severity();

    for diagnostic in report.diagnostics() {
        let severity_indicator = match diagnostic.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
            Severity::Info => "\x1b[34minfo\x1b[0m",
        };

        println!(
            "{} {} at {}",
            diagnostic.code, diagnostic.rule, diagnostic.location
        );
        println!("  {}: {}", severity_indicator, diagnostic.message);
        if let Some(help) = &diagnostic.help {
            println!("  = help: {help}");
        }
        if diagnostic.degraded {
            println!("  = note: location approximated from an enclosing node");
        }
        println!();
    }

    for unit in report.failures() {
        println!(
            "\x1b[31mfailed\x1b[0m to analyze {}: {}",
            unit.unit.display(),
            unit.failure.as_deref().unwrap_or_default()
        );
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} unit(s)\x1b[0m",
        summary_color,
        errors,
        warnings,
        infos,
        report.units.len()
    );
}

fn render_json(report: &RunReport, script: Option<&EditScript>) -> Result<String> {
    let value = serde_json::json!({
        "units": report.units,
        "edits": script,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn render_compact(report: &RunReport) -> String {
    let mut out = String::new();
    for diagnostic in report.diagnostics() {
        let _ = writeln!(out, "{diagnostic}");
    }
    for unit in report.failures() {
        let _ = writeln!(
            out,
            "{}: failed: {}",
            unit.unit.display(),
            unit.failure.as_deref().unwrap_or_default()
        );
    }
    out
}
