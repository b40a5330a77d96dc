// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Random instruction-document generator
//! Produces valid documents across every shape type, and optionally broken
//! ones, to exercise the validator and the whole generation pipeline

use crate::instructions::{CombineOp, InstructionDocument, ShapeKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::f64::consts::TAU;

/// Fuzzer configuration
#[derive(Debug, Clone)]
pub struct FuzzerConfig {
    pub count: usize,
    pub max_shapes: usize,
    /// Probability that a generated document is deliberately invalid
    pub invalid_ratio: f64,
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            count: 100,
            max_shapes: 4,
            invalid_ratio: 0.0,
            seed: 0x5eed,
        }
    }
}

/// One generated document
#[derive(Debug, Clone)]
pub struct FuzzCase {
    pub name: String,
    pub document: InstructionDocument,
    /// Whether the document was built to fail validation
    pub expect_invalid: bool,
}

/// Seeded generator; the same seed yields the same documents
pub struct DocumentFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl DocumentFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// Generate a valid document
    pub fn generate(&mut self) -> InstructionDocument {
        let count = self.rng.gen_range(1..=self.config.max_shapes.max(1));
        let mut document = InstructionDocument::default();
        if self.rng.gen_bool(0.7) {
            document.detail = Some(self.rng.gen_range(0..=100) as f64);
        }
        if self.rng.gen_bool(0.3) {
            document.extrude_height = Some(self.dimension(1.0, 20.0));
        }
        for i in 0..count {
            let kind = *ShapeKind::ALL.choose(&mut self.rng).unwrap_or(&ShapeKind::Box);
            let shape = self.shape(kind, i > 0);
            document.shapes.push(shape);
        }
        document
    }

    /// Generate a document with exactly one broken shape
    pub fn generate_invalid(&mut self) -> InstructionDocument {
        let mut document = self.generate();
        let target = self.rng.gen_range(0..document.shapes.len());
        if let Value::Object(shape) = &mut document.shapes[target] {
            self.break_shape(shape);
        }
        document
    }

    /// Generate a single shape object of the given kind
    pub fn shape(&mut self, kind: ShapeKind, allow_operation: bool) -> Value {
        let mut shape = match kind {
            ShapeKind::Box => json!({
                "type": "box",
                "width": self.dimension(1.0, 30.0),
                "length": self.dimension(1.0, 30.0),
                "height": self.dimension(1.0, 20.0),
            }),
            ShapeKind::Cylinder => json!({
                "type": "cylinder",
                "radius": self.dimension(0.5, 15.0),
                "height": self.dimension(1.0, 30.0),
            }),
            ShapeKind::TaperedCylinder => json!({
                "type": "tapered_cylinder",
                "bottom_radius": self.dimension(0.5, 15.0),
                "top_radius": self.dimension(0.5, 15.0),
                "height": self.dimension(1.0, 30.0),
            }),
            ShapeKind::Polygon => json!({
                "type": "polygon",
                "vertices": self.convex_outline(),
                "height": self.dimension(1.0, 20.0),
            }),
            ShapeKind::Thread => {
                let pitch = self.dimension(0.5, 2.0);
                let turns = self.rng.gen_range(1..=4) as f64;
                json!({
                    "type": "thread",
                    "major_radius": self.dimension(2.0, 8.0),
                    "pitch": pitch,
                    "turns": turns,
                    "length": pitch * turns,
                })
            }
            ShapeKind::Revolve => {
                let inner = self.dimension(0.5, 5.0);
                let outer = inner + self.dimension(0.5, 5.0);
                let height = self.dimension(1.0, 10.0);
                json!({
                    "type": "revolve",
                    "profile": [[inner, 0.0], [outer, 0.0], [outer, height], [inner, height]],
                    "angle_deg": *[90.0, 180.0, 270.0, 360.0].choose(&mut self.rng).unwrap_or(&360.0),
                })
            }
            ShapeKind::Sweep => {
                let half = self.dimension(0.5, 2.0);
                let run = self.dimension(10.0, 30.0);
                let rise = self.dimension(10.0, 30.0);
                json!({
                    "type": "sweep",
                    "profile": [[-half, -half], [half, half]],
                    "path": [[0.0, 0.0, 0.0], [run, 0.0, 0.0], [run, 0.0, rise]],
                })
            }
        };

        if let Value::Object(fields) = &mut shape {
            self.decorate(fields, kind, allow_operation);
        }
        shape
    }

    /// Optional modifiers, placement and operation
    fn decorate(&mut self, fields: &mut Map<String, Value>, kind: ShapeKind, allow_operation: bool) {
        if kind != ShapeKind::Thread && self.rng.gen_bool(0.25) {
            fields.insert("hollow".into(), json!(true));
            fields.insert("wall_thickness".into(), json!(self.dimension(0.2, 1.0)));
        }
        if matches!(kind, ShapeKind::Box | ShapeKind::Cylinder | ShapeKind::Polygon)
            && self.rng.gen_bool(0.2)
        {
            fields.insert("fillet".into(), json!(self.dimension(0.1, 0.5)));
        }
        if self.rng.gen_bool(0.6) {
            let x = self.rng.gen_range(-40.0..=40.0);
            let y = self.rng.gen_range(-40.0..=40.0);
            let position = if self.rng.gen_bool(0.3) {
                json!([x, y, self.rng.gen_range(-10.0..=10.0)])
            } else {
                json!([x, y])
            };
            fields.insert("position".into(), position);
        }
        if self.rng.gen_bool(0.3) {
            fields.insert("rotate_deg".into(), json!(self.rng.gen_range(0.0..360.0)));
        }
        if allow_operation && self.rng.gen_bool(0.5) {
            let op = [
                CombineOp::Union,
                CombineOp::Difference,
                CombineOp::Intersection,
                CombineOp::Concatenate,
            ]
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();
            fields.insert("operation".into(), json!(op.as_str()));
        }
    }

    fn break_shape(&mut self, shape: &mut Map<String, Value>) {
        match self.rng.gen_range(0..=3) {
            0 => {
                shape.insert("type".into(), json!("torus"));
            }
            1 => {
                shape.remove("type");
            }
            2 => {
                shape.insert("operation".into(), json!("xor"));
            }
            _ => {
                let key = ["width", "radius", "bottom_radius", "height", "major_radius", "pitch"]
                    .into_iter()
                    .find(|k| shape.contains_key(*k));
                match key {
                    Some(key) => {
                        shape.insert(key.into(), json!(-1.0));
                    }
                    None => {
                        shape.insert("type".into(), json!(""));
                    }
                }
            }
        }
    }

    fn dimension(&mut self, min: f64, max: f64) -> f64 {
        (self.rng.gen_range(min..=max) * 100.0).round() / 100.0
    }

    /// Convex outline: points on a circle at increasing angles
    fn convex_outline(&mut self) -> Value {
        let n = self.rng.gen_range(3..=8);
        let radius = self.dimension(2.0, 15.0);
        let mut angles: Vec<f64> = (0..n)
            .map(|i| (i as f64 + self.rng.gen_range(0.1..0.9)) * TAU / n as f64)
            .collect();
        angles.sort_by(f64::total_cmp);
        let points: Vec<[f64; 2]> = angles
            .into_iter()
            .map(|a| [radius * a.cos(), radius * a.sin()])
            .collect();
        json!(points)
    }

    /// Generate the configured number of cases
    pub fn run(&mut self) -> Vec<FuzzCase> {
        (0..self.config.count)
            .map(|i| {
                let expect_invalid = self.rng.gen_bool(self.config.invalid_ratio.clamp(0.0, 1.0));
                let document = if expect_invalid {
                    self.generate_invalid()
                } else {
                    self.generate()
                };
                FuzzCase {
                    name: format!("fuzz_{:05}", i),
                    document,
                    expect_invalid,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::validate;

    #[test]
    fn test_fuzzer_generation() {
        let config = FuzzerConfig {
            count: 10,
            ..FuzzerConfig::default()
        };
        let mut fuzzer = DocumentFuzzer::new(config);
        let cases = fuzzer.run();

        assert_eq!(cases.len(), 10);
        for case in cases {
            assert!(!case.document.shapes.is_empty());
            assert!(!case.expect_invalid);
            assert!(validate(&case.document).is_ok(), "{}", case.document.to_json().unwrap());
        }
    }

    #[test]
    fn test_every_kind_validates() {
        let mut fuzzer = DocumentFuzzer::new(FuzzerConfig::default());
        for kind in ShapeKind::ALL {
            for _ in 0..5 {
                let doc = InstructionDocument::default().with_shape(fuzzer.shape(kind, false));
                let validated = validate(&doc).unwrap();
                assert_eq!(validated.shapes[0].kind(), kind);
            }
        }
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let mut fuzzer = DocumentFuzzer::new(FuzzerConfig {
            seed: 7,
            ..FuzzerConfig::default()
        });
        for _ in 0..20 {
            let doc = fuzzer.generate_invalid();
            assert!(validate(&doc).is_err(), "{}", doc.to_json().unwrap());
        }
    }

    #[test]
    fn test_same_seed_same_documents() {
        let a = DocumentFuzzer::new(FuzzerConfig::default()).run();
        let b = DocumentFuzzer::new(FuzzerConfig::default()).run();
        assert_eq!(
            a.iter().map(|c| c.document.to_json().unwrap()).collect::<Vec<_>>(),
            b.iter().map(|c| c.document.to_json().unwrap()).collect::<Vec<_>>()
        );
    }
}
