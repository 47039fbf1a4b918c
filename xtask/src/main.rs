use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Holdfast workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
    /// Model-check the publication and reentrancy protocols with loom
    Loom {
        /// Upper bound on preemptions explored per execution
        #[arg(long)]
        max_preemptions: Option<usize>,
    },
}

const BENCH: &str = "sync_benchmark";
const LOOM_TEST: &str = "singleton_loom";

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
        Commands::Loom { max_preemptions } => run_loom(max_preemptions)?,
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running {BENCH}...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("bench").arg("--bench").arg(BENCH);

    // Args for the test runner (Criterion) go after --
    cmd.arg("--");
    if quick {
        cmd.arg("--measurement-time").arg("0.5");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd.status().context("failed to spawn cargo bench")?;
    if !status.success() {
        anyhow::bail!("benchmark run failed");
    }
    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn run_loom(max_preemptions: Option<usize>) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.env("RUSTFLAGS", "--cfg loom")
        .args(["test", "--release", "--test", LOOM_TEST]);
    if let Some(bound) = max_preemptions {
        cmd.env("LOOM_MAX_PREEMPTIONS", bound.to_string());
    }

    let status = cmd.status().context("failed to spawn cargo test")?;
    if !status.success() {
        anyhow::bail!("loom found a failing interleaving");
    }
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    // group -> function -> mean ns
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }

    use std::fmt::Write;
    let mut out = String::new();
    writeln!(out, "# Sync Benchmark Report")?;

    for (group, functions) in &results {
        let fastest = functions.values().copied().fold(f64::INFINITY, f64::min);

        writeln!(out, "\n## {group}\n")?;
        writeln!(out, "| Variant | Mean | vs fastest |")?;
        writeln!(out, "|---|---|---|")?;
        for (function, ns) in functions {
            writeln!(out, "| {function} | {} | **{:.2}x** |", format_ns(*ns), ns / fastest)?;
        }
    }

    fs::write(report_path, out).with_context(|| format!("writing {}", report_path.display()))?;
    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_ns(ns: f64) -> String {
    if ns >= 1_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if ns >= 1_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else {
        format!("{ns:.1} ns")
    }
}

/// Walks `target/criterion/<group>/<function>/new/estimates.json`.
fn collect_results(dir: &Path, results: &mut BTreeMap<String, BTreeMap<String, f64>>) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }

        let Some(baseline_dir) = path.parent() else { continue };
        if baseline_dir.file_name().and_then(|s| s.to_str()) != Some("new") {
            continue;
        }
        let Some(function_dir) = baseline_dir.parent() else { continue };
        let Some(group_dir) = function_dir.parent() else { continue };
        let (Some(function), Some(group)) = (
            function_dir.file_name().and_then(|s| s.to_str()),
            group_dir.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        if function == "report" || group == "report" {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        let estimates: Estimates = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        results
            .entry(group.to_owned())
            .or_default()
            .insert(function.to_owned(), estimates.mean.point_estimate);
    }
    Ok(())
}
