// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration and the per-job generation settings

use crate::geometry::CsgOptions;
use crate::kernel::KernelSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "shapeforge.toml";

/// Detail used when neither the document nor the config sets one
pub const DEFAULT_DETAIL: f64 = 50.0;

/// Engine-wide settings, shared by every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Detail applied when a document does not carry its own
    pub default_detail: f64,
    /// Build real threads; when off every thread uses the cylinder fallback
    pub helix_synthesis: bool,
    /// Largest combined triangle count a boolean will attempt
    pub boolean_polygon_limit: usize,
    /// Distance under which mesh vertices are merged
    pub weld_epsilon: f64,
    /// Angular step of fillet arcs, in degrees
    pub fillet_arc_step_deg: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_detail: DEFAULT_DETAIL,
            helix_synthesis: true,
            boolean_polygon_limit: CsgOptions::default().max_polygons,
            weld_epsilon: 1e-9,
            fillet_arc_step_deg: 15.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `shapeforge.toml` from the working directory when present, then
    /// apply environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `SHAPEFORGE_*` overrides; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(detail) = lookup("SHAPEFORGE_DETAIL").and_then(|v| v.parse().ok()) {
            self.default_detail = detail;
        }

        if let Some(helix) = lookup("SHAPEFORGE_HELIX").and_then(|v| v.parse().ok()) {
            self.helix_synthesis = helix;
        }

        if let Some(limit) = lookup("SHAPEFORGE_BOOLEAN_LIMIT").and_then(|v| v.parse().ok()) {
            self.boolean_polygon_limit = limit;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn kernel_settings(&self) -> KernelSettings {
        KernelSettings {
            csg: CsgOptions {
                max_polygons: self.boolean_polygon_limit,
                weld_epsilon: self.weld_epsilon.max(1e-7),
            },
            weld_epsilon: self.weld_epsilon,
            fillet_arc_step_deg: self.fillet_arc_step_deg,
        }
    }
}

/// Immutable settings for one generation job, passed explicitly to the
/// planner and the compiler
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationConfig {
    /// Clamped to [0, 100]
    pub detail: f64,
    /// Document-wide default height
    pub extrude_height: Option<f64>,
    /// Document-wide default wall thickness
    pub wall_thickness: Option<f64>,
    pub helix_synthesis: bool,
}

impl GenerationConfig {
    pub fn new(detail: f64) -> Self {
        Self {
            detail: clamp_detail(detail),
            extrude_height: None,
            wall_thickness: None,
            helix_synthesis: true,
        }
    }

    /// Combine document-level values with the engine defaults
    pub fn resolve(
        engine: &EngineConfig,
        detail: Option<f64>,
        extrude_height: Option<f64>,
        wall_thickness: Option<f64>,
    ) -> Self {
        Self {
            detail: clamp_detail(detail.unwrap_or(engine.default_detail)),
            extrude_height,
            wall_thickness,
            helix_synthesis: engine.helix_synthesis,
        }
    }

    pub fn with_helix_synthesis(mut self, enabled: bool) -> Self {
        self.helix_synthesis = enabled;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DETAIL)
    }
}

/// Clamp into [0, 100]; NaN becomes the default
pub fn clamp_detail(detail: f64) -> f64 {
    if detail.is_nan() {
        DEFAULT_DETAIL
    } else {
        detail.clamp(0.0, 100.0)
    }
}
