//! CLI binary for pdftools-client.
//!
//! A thin shim over the library crate: maps CLI flags to a `ClientConfig`,
//! drives one `FileTransformWorkflow` and saves or prints the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdftools_client::backend::{self, ComparisonReport};
use pdftools_client::params::ParamKind;
use pdftools_client::{
    catalog, ClientConfig, FileTransformWorkflow, ObjectUrl, Parameters, PreferenceStore,
    ResponseKind, SelectedFile, Theme, ToolSpec, Transport, WorkflowError, WorkflowObserver,
    WorkflowStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner shown while a submission is in flight.
struct CliObserver {
    bar: ProgressBar,
    started: std::sync::Mutex<Option<Instant>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self {
            bar,
            started: std::sync::Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl WorkflowObserver for CliObserver {
    fn on_status_change(&self, status: &WorkflowStatus) {
        match status {
            WorkflowStatus::Loading => {
                if let Ok(mut started) = self.started.lock() {
                    *started = Some(Instant::now());
                }
                self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            // The error itself is reported by main.
            WorkflowStatus::Error(_) | WorkflowStatus::Success | WorkflowStatus::Idle => {
                self.bar.finish_and_clear()
            }
        }
    }

    fn on_upload_start(&self, tool: &str, file_count: usize, total_bytes: u64) {
        self.bar.set_prefix(tool.to_string());
        self.bar.set_message(format!(
            "uploading {} file{} ({})",
            file_count,
            if file_count == 1 { "" } else { "s" },
            human_bytes(total_bytes)
        ));
    }

    fn on_result(&self, _url: &ObjectUrl, filename: &str, size: usize) {
        eprintln!(
            "{} {}  {}  {}",
            green("✔"),
            bold(filename),
            dim(&human_bytes(size as u64)),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        );
    }

    fn on_discarded(&self, tool: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {} cancelled", cyan("⚠"), tool);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List available tools
  pdftools list

  # Merge two PDFs into merged.pdf in the current directory
  pdftools run merge a.pdf b.pdf

  # Split pages 2-5 into a chosen file
  pdftools run split report.pdf -p pages=2-5 -o part.pdf

  # Add a watermark (second file goes to the 'watermark' slot)
  pdftools run watermark report.pdf --slot watermark=stamp.pdf

  # Password-protect
  pdftools run lock report.pdf -p password=s3cret

  # Compare two documents, JSON report on stdout
  pdftools run compare --slot file1=v1.pdf --slot file2=v2.pdf

  # OCR to stdout
  pdftools run ocr scan.png

  # HTML to PDF from a URL
  pdftools run html-to-pdf -p url=https://example.com -o page.pdf

ENVIRONMENT VARIABLES:
  PDFTOOLS_API_URL     Backend base URL (default http://localhost:5000)
  PDFTOOLS_TIMEOUT     Default request timeout in seconds
  RUST_LOG             Override log filter (e.g. pdftools_client=debug)
"#;

/// Run PDF utilities against a pdftools backend.
#[derive(Parser, Debug)]
#[command(
    name = "pdftools",
    version,
    about = "Run PDF utilities (merge, split, compress, convert, …) against a pdftools backend",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Backend base URL.
    #[arg(long, global = true, env = "PDFTOOLS_API_URL")]
    base_url: Option<String>,

    /// Default request timeout in seconds (tools may override).
    #[arg(long, global = true, env = "PDFTOOLS_TIMEOUT")]
    timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFTOOLS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFTOOLS_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "PDFTOOLS_NO_PROGRESS")]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available tools.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a tool.
    Run(RunArgs),
    /// Print the page count of a PDF.
    PageCount {
        file: PathBuf,
    },
    /// Check backend health.
    Health {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show or change the colour theme preference.
    Theme {
        #[arg(value_enum, default_value = "show")]
        action: ThemeAction,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Tool id (see `pdftools list`).
    tool: String,

    /// Input files for the tool's primary slot.
    files: Vec<PathBuf>,

    /// File for a named slot, e.g. `--slot watermark=stamp.pdf`. Repeatable.
    #[arg(long = "slot", value_name = "FIELD=PATH")]
    slots: Vec<String>,

    /// Tool parameter, e.g. `-p pages=2-5`. Repeatable.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Output file or directory (default: current directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a JSON summary (or the JSON result) on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeAction {
    Show,
    Toggle,
    Dark,
    Light,
}

#[derive(Serialize)]
struct ToolRow<'a> {
    id: &'a str,
    label: &'a str,
    endpoint: &'a str,
    files: Vec<String>,
    params: Vec<String>,
}

impl<'a> From<&'a ToolSpec> for ToolRow<'a> {
    fn from(t: &'a ToolSpec) -> Self {
        Self {
            id: &t.id,
            label: &t.label,
            endpoint: &t.endpoint,
            files: t
                .slots
                .iter()
                .map(|s| {
                    let c = &s.constraints;
                    let count = if c.max_files > 1 {
                        format!("×{}..{}", c.min_files, c.max_files)
                    } else {
                        String::new()
                    };
                    let opt = if s.required { "" } else { "?" };
                    format!("{}{}{}", s.field, count, opt)
                })
                .collect(),
            params: t.params.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    tool: &'a str,
    filename: &'a str,
    mime: &'a str,
    size: usize,
    path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback that matters while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::List { json } => list_tools(&cli, *json),
        Command::Run(args) => run_tool(&cli, args, show_progress).await,
        Command::PageCount { file } => {
            let transport = Transport::new(build_config(&cli)?).context("Invalid configuration")?;
            let file = SelectedFile::from_path(file).await?;
            let pages = backend::page_count(&transport, &file)
                .await
                .context("Page count failed")?;
            println!("{pages}");
            Ok(())
        }
        Command::Health { json } => health(&cli, *json).await,
        Command::Theme { action } => theme(*action),
    }
}

/// Map global flags to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder();
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

fn list_tools(cli: &Cli, json: bool) -> Result<()> {
    let config = build_config(cli)?;
    let tools = catalog::all(&config)?;
    let rows: Vec<ToolRow<'_>> = tools.iter().map(ToolRow::from).collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise tool list")?
        );
        return Ok(());
    }
    for row in rows {
        println!(
            "{:<14} {:<22} {:<18} {}",
            bold(row.id),
            row.label,
            dim(row.endpoint),
            dim(&[row.files.join(" "), row.params.join(" ")].join("  ")),
        );
    }
    Ok(())
}

async fn run_tool(cli: &Cli, args: &RunArgs, show_progress: bool) -> Result<()> {
    let config = build_config(cli)?;
    let tool = catalog::find(&args.tool, &config)?;
    let wants_page_count = tool
        .params
        .iter()
        .any(|p| matches!(p.kind, ParamKind::PageRange | ParamKind::PageList));
    let response = tool.response.clone();

    let mut workflow = FileTransformWorkflow::from_config(tool, config)?;
    if show_progress {
        workflow = workflow.with_observer(CliObserver::new());
    }
    let workflow = Arc::new(workflow);

    // ── Selections ───────────────────────────────────────────────────────
    let mut by_slot: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if !args.files.is_empty() {
        let primary = workflow
            .tool()
            .primary_slot()
            .map(|s| s.field.clone())
            .with_context(|| format!("Tool '{}' takes no input files", args.tool))?;
        by_slot.entry(primary).or_default().extend(args.files.iter().cloned());
    }
    for entry in &args.slots {
        let (field, path) = entry
            .split_once('=')
            .with_context(|| format!("Expected FIELD=PATH, got '{entry}'"))?;
        by_slot
            .entry(field.trim().to_string())
            .or_default()
            .push(PathBuf::from(path));
    }
    for (slot, paths) in by_slot {
        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push(SelectedFile::from_path(path).await?);
        }
        workflow.select_files(&slot, files)?;
    }

    if wants_page_count && workflow.tool().primary_slot().is_some() {
        if let Err(e) = workflow.fetch_page_count().await {
            warn!("Could not read the page count, page numbers are checked by the server: {e}");
        }
    }

    let params = Parameters::from_pairs(&args.params)?;

    // ── Ctrl-C cancels the in-flight request ─────────────────────────────
    let on_interrupt = Arc::clone(&workflow);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.reset();
        }
    });

    let result = workflow.submit(&params).await;
    interrupt.abort();

    let download = match result {
        Ok(d) => d,
        Err(WorkflowError::Cancelled) => bail!("Interrupted"),
        Err(e) => return Err(e).context(format!("{} failed", workflow.tool().label)),
    };

    // ── Output ───────────────────────────────────────────────────────────
    let to_stdout = args.output.is_none() && !matches!(response, ResponseKind::Blob { .. });
    if to_stdout {
        match response {
            ResponseKind::Json => {
                let report: serde_json::Value = download.json()?;
                if !args.json {
                    if let Ok(r) = serde_json::from_value::<ComparisonReport>(report.clone()) {
                        print_comparison(&r);
                        return Ok(());
                    }
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            }
            _ => {
                let text = download.text();
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
        return Ok(());
    }

    let target = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let path = download.save_to(&target).await?;

    if args.json {
        let summary = RunSummary {
            tool: &workflow.tool().id,
            filename: &download.filename,
            mime: &download.mime,
            size: download.bytes.len(),
            path: Some(path),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!("   →  {}", bold(&path.display().to_string()));
    }
    Ok(())
}

fn print_comparison(r: &ComparisonReport) {
    println!("Pages:       {} vs {}", r.file1_pages, r.file2_pages);
    println!("Similarity:  {:.1}%", r.similarity);
    if r.differences.is_empty() {
        println!("{}", green("No differences"));
        return;
    }
    println!("Differences:");
    for line in &r.differences {
        if line.starts_with('+') {
            println!("  {}", green(line));
        } else if line.starts_with('-') {
            println!("  {}", red(line));
        } else {
            println!("  {}", dim(line));
        }
    }
}

async fn health(cli: &Cli, json: bool) -> Result<()> {
    let transport = Transport::new(build_config(cli)?).context("Invalid configuration")?;
    let report = backend::health(&transport)
        .await
        .context("Health check failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise health report")?
        );
    } else {
        let mark = if report.is_healthy() { green("✔") } else { red("✘") };
        println!(
            "{} {}  {}",
            mark,
            bold(&report.status),
            dim(report.version.as_deref().unwrap_or(""))
        );
        for (name, ok) in &report.checks {
            println!("  {} {}", if *ok { green("✓") } else { red("✗") }, name);
        }
    }
    if !report.is_healthy() {
        bail!("Backend is {}", report.status);
    }
    Ok(())
}

fn theme(action: ThemeAction) -> Result<()> {
    let store = PreferenceStore::load_default()?;
    let theme = match action {
        ThemeAction::Show => store.theme(),
        ThemeAction::Toggle => store.toggle()?,
        ThemeAction::Dark => {
            store.set_theme(Theme::Dark)?;
            Theme::Dark
        }
        ThemeAction::Light => {
            store.set_theme(Theme::Light)?;
            Theme::Light
        }
    };
    println!("{theme}");
    Ok(())
}
