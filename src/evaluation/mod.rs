// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fuzz harness: random documents through the full pipeline

pub mod fuzzer;
pub mod reporter;

pub use fuzzer::{DocumentFuzzer, FuzzCase, FuzzerConfig};
pub use reporter::{FuzzFailure, FuzzReport};

use crate::pipeline::{Engine, GenerateError};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

enum CaseOutcome {
    Generated(usize),
    Rejected,
    Failed(String),
}

/// Generate `config.count` documents and run each one as its own job.
///
/// A case fails when a valid document does not produce a model, or when a
/// deliberately broken one gets past validation.
pub fn run_fuzz(engine: &Engine, config: FuzzerConfig) -> FuzzReport {
    let start = Instant::now();
    let seed = config.seed;
    let cases = DocumentFuzzer::new(config).run();

    let outcomes: Vec<(FuzzCase, CaseOutcome)> = cases
        .into_par_iter()
        .map(|case| {
            let outcome = run_case(engine, &case);
            (case, outcome)
        })
        .collect();

    let mut report = FuzzReport::new(seed);
    for (case, outcome) in outcomes {
        match outcome {
            CaseOutcome::Generated(warnings) => report.add_generated(warnings),
            CaseOutcome::Rejected => report.add_rejected(),
            CaseOutcome::Failed(error) => {
                let document = case.document.to_json().unwrap_or_else(|err| {
                    warn!(case = %case.name, %err, "failed to serialize fuzz document");
                    format!("<unserializable document: {err}>")
                });
                report.add_failure(case.name, error, document)
            }
        }
    }
    report.duration_ms = start.elapsed().as_millis();
    report
}

fn run_case(engine: &Engine, case: &FuzzCase) -> CaseOutcome {
    let result = engine.generate(&case.document);
    debug!(case = %case.name, ok = result.is_ok(), "fuzz case");

    match (result, case.expect_invalid) {
        (Ok(generation), false) => CaseOutcome::Generated(generation.warnings().len()),
        (Ok(_), true) => CaseOutcome::Failed("broken document passed validation".into()),
        (Err(GenerateError::Validation(_)), true) => CaseOutcome::Rejected,
        (Err(err), _) => CaseOutcome::Failed(err.to_string()),
    }
}
