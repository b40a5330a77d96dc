// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::runner::{JobOutcome, JobResult};
use crate::evaluation::FuzzReport;
use crate::report::QualityReport;
use crate::tessellation::ShapePlan;
use colored::*;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report one generation job
    pub fn report_job(result: &JobResult) {
        let file = result.path.display().to_string();
        match &result.outcome {
            JobOutcome::Generated(report) => Self::report_generated(&file, report, result.duration),
            JobOutcome::Rejected(err) => {
                println!(
                    "{} {} {}",
                    "✗".red(),
                    file.cyan(),
                    format!("[{}]", err.reason).yellow()
                );
                println!("    {}", err.to_string().bright_black());
            }
            JobOutcome::Failed(message) => {
                println!("{} {}", "✗".red(), file.cyan());
                println!("    {}", message.red());
            }
        }
    }

    fn report_generated(file: &str, report: &QualityReport, duration: Duration) {
        let mark = if report.warnings.is_empty() {
            "✓".green()
        } else {
            "!".yellow()
        };
        println!(
            "{} {} {}",
            mark,
            file.cyan(),
            format!("({})", Self::format_duration(duration)).bright_black()
        );
        println!(
            "    {} {}  {} {}  {} {}  {} {:.2}",
            "shapes:".bright_black(),
            report.shapes_generated,
            "bodies:".bright_black(),
            report.body_count,
            "triangles:".bright_black(),
            report.polygon_count,
            "volume:".bright_black(),
            report.total_volume
        );
        for warning in &report.warnings {
            println!("    {} {}", "warning:".yellow(), warning);
        }
        let missing = report.missing_features();
        if !missing.is_empty() {
            println!("    {} {}", "not produced:".yellow(), missing.join(", "));
        }
    }

    /// Totals across a batch
    pub fn report_summary(results: &[JobResult], elapsed: Duration) {
        let generated = results.iter().filter(|r| r.succeeded()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r.outcome, JobOutcome::Rejected(_)))
            .count();
        let failed = results.len() - generated - rejected;
        let degraded = results
            .iter()
            .filter(|r| matches!(&r.outcome, JobOutcome::Generated(report) if !report.warnings.is_empty()))
            .count();

        println!("\n{}", "━".repeat(80).bright_black());
        println!(
            "{} {} documents in {}",
            "Summary:".bold(),
            results.len(),
            Self::format_duration(elapsed).yellow()
        );
        println!(
            "  {} {}  {} {}  {} {}  {} {}",
            "generated:".bright_black(),
            generated.to_string().green(),
            "degraded:".bright_black(),
            degraded.to_string().yellow(),
            "rejected:".bright_black(),
            rejected.to_string().red(),
            "failed:".bright_black(),
            failed.to_string().red()
        );
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Segment count per shape
    pub fn report_plan(file: &str, detail: f64, plans: &[ShapePlan]) {
        println!("{} {} {}", "Plan:".bold(), file.cyan(), format!("(detail {detail})").bright_black());
        for plan in plans {
            println!(
                "  {:>3}  {:<18} {} segments",
                plan.shape_index,
                plan.kind.as_str(),
                plan.segments.to_string().cyan()
            );
        }
    }

    pub fn report_fuzz(report: &FuzzReport) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} seed {}", "Fuzz:".bold(), report.seed);
        println!(
            "  {} {}  {} {}  {} {}  {} {}",
            "cases:".bright_black(),
            report.total_cases,
            "generated:".bright_black(),
            report.generated.to_string().green(),
            "rejected:".bright_black(),
            report.rejected,
            "degraded:".bright_black(),
            report.degraded.to_string().yellow()
        );
        for failure in &report.failures {
            println!("  {} {}: {}", "✗".red(), failure.case.cyan(), failure.error);
        }
        if report.passed() {
            println!("{}", "All cases behaved as expected".green().bold());
        } else {
            println!(
                "{}",
                format!("{} unexpected failures", report.failures.len()).red().bold()
            );
        }
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report success
    pub fn report_ok(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Format duration in human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let ms = duration.as_millis();
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.2}s", duration.as_secs_f64())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(Reporter::format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(Reporter::format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
