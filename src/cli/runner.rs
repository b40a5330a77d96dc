// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Batch runner: one generation job per instruction document

use crate::instructions::{InstructionDocument, ValidationError};
use crate::kernel::{FaultyKernel, KernelOp};
use crate::pipeline::{Engine, GenerateError};
use crate::report::QualityReport;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;
use walkdir::WalkDir;

/// What happened to one document
#[derive(Debug)]
pub enum JobOutcome {
    Generated(Box<QualityReport>),
    Rejected(ValidationError),
    /// Unreadable input, fatal compilation error, or a report that could not
    /// be written
    Failed(String),
}

#[derive(Debug)]
pub struct JobResult {
    pub path: PathBuf,
    pub duration: Duration,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, JobOutcome::Generated(_))
    }
}

/// Runs documents through the engine, in parallel
pub struct Runner {
    engine: Engine,
    failing: Vec<KernelOp>,
    report_dir: Option<PathBuf>,
}

impl Runner {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            failing: Vec::new(),
            report_dir: None,
        }
    }

    /// Force these kernel operations to fail in every job
    pub fn with_failing(mut self, ops: Vec<KernelOp>) -> Self {
        self.failing = ops;
        self
    }

    /// Write `<name>.quality.json` for each generated document
    pub fn with_report_dir(mut self, dir: PathBuf) -> Self {
        self.report_dir = Some(dir);
        self
    }

    /// Expand directories into the `.json` documents they contain
    pub fn discover(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut found: Vec<PathBuf> = WalkDir::new(input)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| e.path().extension().map(|s| s == "json").unwrap_or(false))
                    .filter(|e| !e.path().to_string_lossy().ends_with(".quality.json"))
                    .map(|e| e.path().to_path_buf())
                    .collect();
                found.sort();
                files.extend(found);
            } else if input.exists() {
                files.push(input.clone());
            } else {
                bail!("Input not found: {}", input.display());
            }
        }
        Ok(files)
    }

    pub fn run_all(&self, files: &[PathBuf], show_progress: bool) -> Result<Vec<JobResult>> {
        if let Some(dir) = &self.report_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
        }

        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                    )
                    .map(|style| style.progress_chars("#>-"))
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        });

        let results: Vec<JobResult> = files
            .par_iter()
            .map(|path| {
                let result = self.run_file(path);
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                result
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        Ok(results)
    }

    /// Run one document. Never returns early; every problem ends up in the
    /// outcome.
    pub fn run_file(&self, path: &Path) -> JobResult {
        let start = Instant::now();
        let outcome = match self.generate(path) {
            Ok(report) => JobOutcome::Generated(Box::new(report)),
            Err(err) => match err.downcast::<GenerateError>() {
                Ok(GenerateError::Validation(e)) => JobOutcome::Rejected(e),
                Ok(other) => JobOutcome::Failed(other.to_string()),
                Err(other) => JobOutcome::Failed(format!("{other:#}")),
            },
        };
        debug!(path = %path.display(), ok = matches!(outcome, JobOutcome::Generated(_)), "job finished");

        JobResult {
            path: path.to_path_buf(),
            duration: start.elapsed(),
            outcome,
        }
    }

    fn generate(&self, path: &Path) -> Result<QualityReport> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = InstructionDocument::from_json(&json).map_err(GenerateError::from)?;

        let mut kernel = FaultyKernel::new(self.engine.kernel()).fail_on_all(self.failing.iter().copied());
        let generation = self.engine.generate_with_kernel(&mut kernel, &document)?;

        if let Some(dir) = &self.report_dir {
            generation.report.write_json(dir.join(report_name(path)))?;
        }
        Ok(generation.report)
    }
}

/// `part.json` -> `part.quality.json`
pub fn report_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.quality.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::ValidationReason;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_discover_skips_reports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "a.quality.json", "{}");
        write(dir.path(), "notes.txt", "");

        let files = Runner::discover(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.json"));

        assert!(Runner::discover(&[dir.path().join("missing.json")]).is_err());
    }

    #[test]
    fn test_run_all_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        let good = write(
            dir.path(),
            "good.json",
            r#"{"shapes": [{"type": "cylinder", "radius": 2, "height": 4}]}"#,
        );
        let bad = write(dir.path(), "bad.json", r#"{"shapes": [{"type": "torus"}]}"#);

        let runner = Runner::new(Engine::default()).with_report_dir(reports.clone());
        let results = runner.run_all(&[good, bad], false).unwrap();

        assert!(results[0].succeeded());
        assert!(reports.join("good.quality.json").exists());
        match &results[1].outcome {
            JobOutcome::Rejected(e) => {
                assert_eq!(e.reason, ValidationReason::UnknownShapeType);
                assert_eq!(e.shape_index, Some(0));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_failing_transform_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "part.json",
            r#"{"shapes": [{"type": "box", "width": 1, "length": 1, "height": 1}]}"#,
        );

        let runner = Runner::new(Engine::default()).with_failing(vec![KernelOp::Transform]);
        let result = runner.run_file(&path);
        assert!(matches!(result.outcome, JobOutcome::Failed(_)));
    }
}
