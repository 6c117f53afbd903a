//! Pipeline CLI Module
//!
//! Command-line interface for validation, training, prediction and serving.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::config::{resolve_config_path, PipelineConfig, RunKind};
use crate::pipeline::{run_validation_stages, PredictPipeline, TrainPipeline};
use crate::promotion::ArtifactStore;
use crate::store::LocalDocumentStore;
use crate::utils::file_name;
use crate::validation::Verdict;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(230, 110, 110) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", bad("✗"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch ML pipeline: validate raw batches, tune models, promote and predict")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline config file (defaults to params.toml)
    #[arg(short, long, global = true, env = "KOLOSAL_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate raw batches, load them into the store and export the table
    Validate {
        /// Which run's batch directory to validate
        #[arg(short, long, value_enum, default_value_t = RunKind::Train)]
        run: RunKind,
    },

    /// Run the training pipeline and promote the best model
    Train,

    /// Run the prediction pipeline with the production model
    Predict,

    /// Show the contents of the model slots
    #[command(alias = "promote-status")]
    Status,

    /// Start the HTTP server
    Serve {
        /// Server port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (overrides the config file)
        #[arg(long)]
        host: Option<String>,
    },
}

/// Resolve and load the pipeline config
pub fn load_config(cli_path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let path = resolve_config_path(cli_path);
    PipelineConfig::load(&path).with_context(|| format!("loading config {}", path.display()))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_validate(config: &PipelineConfig, run: RunKind) -> anyhow::Result<()> {
    section(&format!("Validate {}", run));

    step_run("Validating raw batches");
    let store = LocalDocumentStore::new(&config.store.root);
    let (summary, _) = run_validation_stages(config, run, &store)?;
    step_done(&format!(
        "{} good, {} bad",
        summary.report.good_files().len(),
        summary.report.bad_files().len()
    ));

    println!();
    for v in &summary.report.verdicts {
        match &v.verdict {
            Verdict::Good => step_ok(&v.file),
            Verdict::Bad(reason) => step_fail(&format!("{}  {}", v.file, muted(&reason.to_string()))),
        }
    }

    println!();
    println!("  {:<16} {}", muted("Quoted cells"), summary.quoted.to_string().white());
    println!("  {:<16} {}", muted("Inserted rows"), summary.inserted.to_string().white());
    println!("  {:<16} {}", muted("Exported rows"), summary.exported_rows.to_string().white());
    println!();
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Train");

    step_run("Running training pipeline");
    let store = LocalDocumentStore::new(&config.store.root);
    let summary = TrainPipeline::new(config, &store).run()?;
    step_done(&format!("{:.2}s", summary.duration_secs));

    println!();
    for model in &summary.models {
        let marker = if model.name == summary.promotion.production { ok("★") } else { dim("·") };
        println!(
            "  {} {:<26} {}",
            marker,
            model.name,
            format!("{:.4}", model.roc_auc).white().bold()
        );
    }

    println!();
    println!("  {:<16} {}", muted("Production"), accent(&summary.promotion.production));
    println!("  {:<16} {}", muted("Staged"), summary.promotion.staged.join(", ").white());
    println!();
    Ok(())
}

pub fn cmd_predict(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Predict");

    step_run("Running prediction pipeline");
    let store = LocalDocumentStore::new(&config.store.root);
    let summary = PredictPipeline::new(config, &store).run()?;
    step_done(&format!("{:.2}s", summary.duration_secs));

    let output = &summary.prediction;
    println!();
    println!("  {:<16} {}", muted("Model"), accent(&output.model));
    println!("  {:<16} {}", muted("Rows"), output.rows.to_string().white());
    println!("  {:<16} {}", muted("Output"), output.output_file.display().to_string().white());
    println!("  {:<16} {}", muted("Preview"), dim(&output.preview));
    println!();
    Ok(())
}

pub fn cmd_status(config: &PipelineConfig) -> anyhow::Result<()> {
    let artifacts = ArtifactStore::new(&config.artifacts);

    for (title, dir) in [("Trained", artifacts.trained_dir()), ("Staging", artifacts.staging_dir())] {
        section(title);
        let files = artifacts.artifacts_in(dir)?;
        if files.is_empty() {
            println!("  {}", dim("empty"));
        }
        for path in files {
            println!("  {} {}", dim("·"), file_name(&path));
        }
    }

    section("Production");
    match artifacts.production().current_name() {
        Ok(name) => step_ok(&name),
        Err(e) => println!("  {}", e.to_string().yellow()),
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(mut config: PipelineConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::run_server;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let (host, port) = (config.server.host.clone(), config.server.port);

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Kolosal Pipeline".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Train  ", &format!("http://{}:{}/train", host, port)));
    line_box(&kv("Predict", &format!("http://{}:{}/predict", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}
