// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shapeforge CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use shapeforge::cli::{Reporter, Runner};
use shapeforge::config::{clamp_detail, EngineConfig, GenerationConfig};
use shapeforge::evaluation::{run_fuzz, FuzzerConfig};
use shapeforge::instructions::{validate, InstructionDocument};
use shapeforge::kernel::KernelOp;
use shapeforge::pipeline::Engine;
use shapeforge::tessellation;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shapeforge")]
#[command(about = "Shapeforge - procedural solids from shape-instruction documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (defaults to ./shapeforge.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate models from instruction documents
    Generate {
        /// Documents or directories of documents
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Detail level (0-100) for documents without their own
        #[arg(short, long)]
        detail: Option<f64>,

        /// Directory for <name>.quality.json reports
        #[arg(short, long)]
        report_dir: Option<PathBuf>,

        /// Build threads as plain cylinders
        #[arg(long)]
        no_helix: bool,

        /// Force a kernel operation to fail (repeatable)
        #[arg(long = "fail", value_name = "OP")]
        fail: Vec<KernelOp>,
    },

    /// Validate a document without building anything
    Validate {
        input: PathBuf,
    },

    /// Show the tessellation plan for a document
    Plan {
        input: PathBuf,

        /// Detail level (0-100) for documents without their own
        #[arg(short, long)]
        detail: Option<f64>,
    },

    /// Run randomly generated documents through the engine
    Fuzz {
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        #[arg(short, long, default_value = "24301")]
        seed: u64,

        /// Share of deliberately broken documents
        #[arg(long, default_value = "0.2")]
        invalid_ratio: f64,

        /// Directory for fuzz.json and fuzz.md
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Generate {
            inputs,
            detail,
            report_dir,
            no_helix,
            fail,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(detail) = detail {
                config.default_detail = clamp_detail(*detail);
            }
            if *no_helix {
                config.helix_synthesis = false;
            }
            generate_command(config, inputs, report_dir.clone(), fail.clone(), cli.verbose)?;
        }
        Commands::Validate { input } => {
            validate_command(input)?;
        }
        Commands::Plan { input, detail } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(detail) = detail {
                config.default_detail = clamp_detail(*detail);
            }
            plan_command(&config, input)?;
        }
        Commands::Fuzz {
            count,
            seed,
            invalid_ratio,
            out,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let fuzz = FuzzerConfig {
                count: *count,
                invalid_ratio: *invalid_ratio,
                seed: *seed,
                ..FuzzerConfig::default()
            };
            fuzz_command(config, fuzz, out.as_deref())?;
        }
        Commands::Version => {
            println!("Shapeforge v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let mut config = EngineConfig::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => EngineConfig::load(),
    }
}

fn read_document(path: &Path) -> Result<InstructionDocument> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(InstructionDocument::from_json(&json)?)
}

fn generate_command(
    config: EngineConfig,
    inputs: &[PathBuf],
    report_dir: Option<PathBuf>,
    fail: Vec<KernelOp>,
    verbose: bool,
) -> Result<()> {
    let files = Runner::discover(inputs)?;
    if files.is_empty() {
        Reporter::report_error("No instruction documents found");
        std::process::exit(1);
    }
    if !fail.is_empty() {
        let ops: Vec<&str> = fail.iter().map(KernelOp::as_str).collect();
        Reporter::report_info(&format!("Forcing kernel failures: {}", ops.join(", ")));
    }

    let mut runner = Runner::new(Engine::new(config)).with_failing(fail);
    if let Some(dir) = report_dir {
        runner = runner.with_report_dir(dir);
    }

    let start = Instant::now();
    let results = runner.run_all(&files, !verbose && files.len() > 1)?;
    for result in &results {
        Reporter::report_job(result);
    }
    Reporter::report_summary(&results, start.elapsed());

    if results.iter().any(|r| !r.succeeded()) {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_command(input: &Path) -> Result<()> {
    let document = read_document(input);
    match document.and_then(|doc| validate(&doc).map_err(Into::into)) {
        Ok(validated) => {
            Reporter::report_ok(&format!(
                "{} is valid ({} shapes)",
                input.display(),
                validated.shapes.len()
            ));
            Ok(())
        }
        Err(err) => {
            Reporter::report_error(&format!("{}: {err:#}", input.display()));
            std::process::exit(1);
        }
    }
}

fn plan_command(config: &EngineConfig, input: &Path) -> Result<()> {
    let document = read_document(input)?;
    let validated = match validate(&document) {
        Ok(validated) => validated,
        Err(err) => {
            Reporter::report_error(&format!("{}: {err}", input.display()));
            std::process::exit(1);
        }
    };

    let generation = GenerationConfig::resolve(
        config,
        validated.detail,
        validated.extrude_height,
        validated.wall_thickness,
    );
    let plans = tessellation::plan(&validated, &generation);
    Reporter::report_plan(&input.display().to_string(), generation.detail, &plans);
    Ok(())
}

fn fuzz_command(config: EngineConfig, fuzz: FuzzerConfig, out: Option<&Path>) -> Result<()> {
    println!("{}", format!("Fuzzing {} documents...", fuzz.count).bold());
    let report = run_fuzz(&Engine::new(config), fuzz);
    Reporter::report_fuzz(&report);

    if let Some(dir) = out {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        report.write_json(&dir.join("fuzz.json"))?;
        report.write_markdown(&dir.join("fuzz.md"))?;
        Reporter::report_info(&format!("Reports written to {}", dir.display()));
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
