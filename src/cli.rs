use crate::config::{self, Config};
use crate::engine::{DesignEngine, GeminiClient};
use crate::model::{ApiConfig, AppEvent, AppMode, GeneratedResult, RunConfig};
use crate::session::Session;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
#[derive(Debug, PartialEq)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "lasercraft",
    version,
    about = "Generate laser-cutting SVG designs from a text prompt, with optional TUI"
)]
pub struct Cli {
    /// Design prompt (pre-fills the TUI prompt; required with --json/--text)
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Generation mode
    #[arg(long, value_enum)]
    pub mode: Option<AppMode>,

    /// Cut line color (#RRGGBB)
    #[arg(long)]
    pub cut_color: Option<String>,

    /// Engrave color (#RRGGBB)
    #[arg(long)]
    pub engrave_color: Option<String>,

    /// Cut stroke width in millimeters
    #[arg(long)]
    pub cut_stroke_width: Option<f64>,

    /// Material thickness in millimeters
    #[arg(long)]
    pub material_thickness: Option<f64>,

    /// Print the generated design as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// With --json: print only the JSON result and errors, no progress or logs (for scripting)
    #[arg(long)]
    pub silent: bool,

    /// Write the SVG into the output directory after generating (non-TUI)
    #[arg(long)]
    pub export_svg: bool,

    /// Write the A4 PDF preview into the output directory after generating (non-TUI)
    #[arg(long)]
    pub export_pdf: bool,

    /// Directory for exported files
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the generation API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Thinking token budget for the model
    #[arg(long)]
    pub thinking_budget: Option<u32>,

    /// Language of the design description
    #[arg(long)]
    pub description_language: Option<String>,

    /// API key (defaults to GEMINI_API_KEY, then API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start generating as soon as the TUI opens (needs --prompt)
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub generate_on_launch: bool,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !(self.json || self.text || self.silent)
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    let file_config = Config::load(args.config.as_deref())?;
    let cfg = build_config(&args, &file_config)?;

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(&args, &cfg, false).await;
        }
    }

    run_once(&args, &cfg, args.json).await
}

/// Build a `RunConfig` from CLI arguments layered over the config file.
pub fn build_config(args: &Cli, file: &Config) -> Result<RunConfig> {
    let mut settings = file.settings.clone();
    if let Some(c) = args.cut_color.as_deref() {
        settings.cut_color = crate::settings::normalize_color(c).context("--cut-color")?;
    }
    if let Some(c) = args.engrave_color.as_deref() {
        settings.engrave_color = crate::settings::normalize_color(c).context("--engrave-color")?;
    }
    if let Some(w) = args.cut_stroke_width {
        settings.cut_stroke_width = w;
    }
    if let Some(t) = args.material_thickness {
        settings.material_thickness = t;
    }
    settings.validate().context("invalid laser settings")?;

    let api = ApiConfig {
        base_url: args
            .base_url
            .clone()
            .unwrap_or_else(|| file.api.base_url.clone()),
        model: args.model.clone().unwrap_or_else(|| file.api.model.clone()),
        api_key: args
            .api_key
            .clone()
            .or_else(config::api_key_from_env)
            .unwrap_or_default(),
        timeout: args
            .timeout
            .map(Into::into)
            .unwrap_or(file.api.timeout),
        thinking_budget: args.thinking_budget.unwrap_or(file.api.thinking_budget),
        description_language: args
            .description_language
            .clone()
            .unwrap_or_else(|| file.api.description_language.clone()),
        user_agent: format!("lasercraft-cli/{}", env!("CARGO_PKG_VERSION")),
    };

    Ok(RunConfig {
        api,
        prompt: args.prompt.clone().unwrap_or_default(),
        mode: args.mode.unwrap_or_default(),
        settings,
        out_dir: args
            .out_dir
            .clone()
            .unwrap_or_else(|| file.export.out_dir.clone()),
        generate_on_launch: args.generate_on_launch,
    })
}

/// Generate once, print the outcome and run the requested exports.
async fn run_once(args: &Cli, cfg: &RunConfig, json: bool) -> Result<()> {
    let mut session = Session::new(cfg.prompt.clone(), cfg.mode, cfg.settings.clone());
    let request = session
        .submit()
        .context("--prompt is required (and must not be blank) with --json/--text")?;

    let client = GeminiClient::new(&cfg.api)?;
    let engine = DesignEngine::new(client);

    let (out_tx, out_handle) = spawn_output_writer();

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let progress_tx = if json || args.silent {
        None
    } else {
        Some(out_tx.clone())
    };
    let progress = tokio::spawn(async move {
        while let Some(ev) = evt_rx.recv().await {
            if let (Some(tx), AppEvent::GenerationStarted) = (progress_tx.as_ref(), &ev) {
                let _ = tx.send(OutputLine::Stderr("Generating design…".into()));
            }
        }
    });

    let outcome = engine.run(request, &evt_tx).await;
    drop(evt_tx);
    let _ = progress.await;
    session.complete(outcome);

    let result = match session.result() {
        Some(r) => r.clone(),
        None => {
            let message = session.error().unwrap_or("generation failed").to_string();
            finish_output(out_tx, out_handle).await;
            return Err(anyhow::anyhow!(message));
        }
    };

    let processed = crate::orchestrator::process_generation(
        &result,
        &cfg.out_dir,
        args.export_svg,
        args.export_pdf,
    )
    .await;

    tracing::debug!(files = processed.exported.len(), "exports written");

    let lines = result_lines(
        &result,
        cfg,
        json,
        args.silent,
        &processed.export_messages,
    )?;
    for line in lines {
        let _ = out_tx.send(line);
    }
    finish_output(out_tx, out_handle).await;

    if let Some(e) = processed.first_error {
        return Err(e);
    }
    Ok(())
}

/// Lines to print for a finished generation. Silent mode keeps the result
/// itself and drops the export messages.
fn result_lines(
    result: &GeneratedResult,
    cfg: &RunConfig,
    json: bool,
    silent: bool,
    export_messages: &[String],
) -> Result<Vec<OutputLine>> {
    let mut lines = Vec::new();
    if json {
        lines.push(OutputLine::Stdout(serde_json::to_string_pretty(result)?));
    } else {
        let summary = crate::text_summary::build_text_summary(result, &cfg.settings, cfg.mode);
        lines.extend(summary.lines.into_iter().map(OutputLine::Stdout));
    }
    if !silent {
        lines.extend(export_messages.iter().cloned().map(OutputLine::Stderr));
    }
    Ok(lines)
}

async fn finish_output(
    out_tx: mpsc::UnboundedSender<OutputLine>,
    out_handle: tokio::task::JoinHandle<()>,
) {
    drop(out_tx);
    let _ = out_handle.await;
}
