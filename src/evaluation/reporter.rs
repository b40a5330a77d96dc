// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fuzz report (JSON and Markdown)

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A case that did not behave as expected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzFailure {
    pub case: String,
    pub error: String,
    pub document: String,
}

/// Outcome of one fuzz run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzReport {
    pub timestamp: String,
    pub seed: u64,
    pub total_cases: usize,
    pub generated: usize,
    pub rejected: usize,
    pub degraded: usize,
    pub total_warnings: usize,
    pub duration_ms: u128,
    pub failures: Vec<FuzzFailure>,
}

impl FuzzReport {
    pub fn new(seed: u64) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            seed,
            total_cases: 0,
            generated: 0,
            rejected: 0,
            degraded: 0,
            total_warnings: 0,
            duration_ms: 0,
            failures: Vec::new(),
        }
    }

    /// Record a document that produced a model
    pub fn add_generated(&mut self, warnings: usize) {
        self.total_cases += 1;
        self.generated += 1;
        self.total_warnings += warnings;
        if warnings > 0 {
            self.degraded += 1;
        }
    }

    /// Record a document the validator turned down as expected
    pub fn add_rejected(&mut self) {
        self.total_cases += 1;
        self.rejected += 1;
    }

    pub fn add_failure(&mut self, case: String, error: String, document: String) {
        self.total_cases += 1;
        self.failures.push(FuzzFailure {
            case,
            error,
            document,
        });
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn success_rate(&self) -> f32 {
        if self.total_cases == 0 {
            0.0
        } else {
            ((self.total_cases - self.failures.len()) as f32 / self.total_cases as f32) * 100.0
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn write_markdown(&self, path: &Path) -> Result<()> {
        let mut md = String::new();

        md.push_str(&format!("# Shapeforge Fuzz Report ({})\n\n", self.timestamp));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Seed**: {}\n", self.seed));
        md.push_str(&format!("- **Cases**: {}\n", self.total_cases));
        md.push_str(&format!("- **Generated**: {}\n", self.generated));
        md.push_str(&format!("- **Rejected by validation**: {}\n", self.rejected));
        md.push_str(&format!(
            "- **Degraded** (at least one warning): {}\n",
            self.degraded
        ));
        md.push_str(&format!("- **Failures**: {}\n", self.failures.len()));
        md.push_str(&format!("- **Success rate**: {:.1}%\n", self.success_rate()));
        md.push_str(&format!("- **Duration**: {}ms\n\n", self.duration_ms));

        if !self.failures.is_empty() {
            md.push_str("## Failures\n\n");
            for failure in &self.failures {
                md.push_str(&format!("### {}\n\n", failure.case));
                md.push_str(&format!("{}\n\n", failure.error));
                md.push_str(&format!("```json\n{}\n```\n\n", failure.document));
            }
        }

        fs::write(path, md)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = FuzzReport::new(1);
        report.add_generated(0);
        report.add_generated(2);
        report.add_rejected();
        report.add_failure("fuzz_00003".into(), "boom".into(), "{}".into());

        assert_eq!(report.total_cases, 4);
        assert_eq!(report.degraded, 1);
        assert_eq!(report.total_warnings, 2);
        assert!(!report.passed());
        assert_eq!(report.success_rate(), 75.0);
    }

    #[test]
    fn test_write_markdown() {
        let mut report = FuzzReport::new(9);
        report.add_failure("fuzz_00000".into(), "shape 0 failed".into(), "{}".into());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzz.md");

        report.write_markdown(&path).unwrap();
        let md = fs::read_to_string(&path).unwrap();
        assert!(md.contains("### fuzz_00000"));
        assert!(md.contains("**Seed**: 9"));
    }
}
