//! Generation lifecycle controller.
//!
//! Owns the network round-trip and the PDF export task, and emits events for
//! presentation layers. At most one generation and one PDF export run at a time.
//! Requests cannot be cancelled; quitting waits for them to finish.

use super::post_process::export_pdf_blocking;
use crate::engine::{completion_event, DesignEngine, DesignGenerator};
use crate::model::{AppEvent, ExportKind, GeneratedResult, GenerationRequest, InfoEvent};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

pub(crate) const BUSY_MESSAGE: &str = "A generation is already running.";
pub(crate) const EXPORT_BUSY_MESSAGE: &str = "A PDF export is already running.";

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Generate(GenerationRequest),
    ExportPdf(Box<GeneratedResult>),
    Quit,
}

type GenerationHandle = tokio::task::JoinHandle<Result<GeneratedResult, String>>;
type ExportHandle = tokio::task::JoinHandle<Result<PathBuf>>;

/// Spawn a generation task. The completion event is sent by the controller once
/// the task has been joined, so the UI never sees completion while the slot is busy.
fn start_generation<G: DesignGenerator>(
    engine: &Arc<DesignEngine<G>>,
    req: GenerationRequest,
    event_tx: &UnboundedSender<AppEvent>,
) -> GenerationHandle {
    let _ = event_tx.send(AppEvent::GenerationStarted);
    let engine = Arc::clone(engine);
    tokio::spawn(async move { engine.generate(req).await })
}

/// Wait on an optional handle; pending forever when there is none.
async fn join_slot<T>(slot: &mut Option<tokio::task::JoinHandle<T>>) -> Result<T, tokio::task::JoinError> {
    match slot.as_mut() {
        Some(h) => h.await,
        None => futures::future::pending().await,
    }
}

/// Serve UI commands until `Quit` (or the command channel closes) and all work is done.
pub(crate) async fn run_controller<G: DesignGenerator>(
    generator: G,
    out_dir: PathBuf,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let engine = Arc::new(DesignEngine::new(generator));
    let mut generation: Option<GenerationHandle> = None;
    let mut export: Option<ExportHandle> = None;
    let mut quit_pending = false;
    // Quit watchdog: if the in-flight request keeps us waiting, tell the user why.
    let mut quit_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    loop {
        if quit_pending && generation.is_none() && export.is_none() {
            break;
        }

        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Generate(req)) => {
                        if generation.is_some() {
                            tracing::warn!("generate requested while another generation is in flight");
                            let _ = event_tx.send(AppEvent::GenerationFailed {
                                message: BUSY_MESSAGE.into(),
                            });
                        } else {
                            generation = Some(start_generation(&engine, req, &event_tx));
                        }
                    }
                    Some(UiCommand::ExportPdf(result)) => {
                        if export.is_some() {
                            let _ = event_tx.send(AppEvent::ExportFinished {
                                kind: ExportKind::Pdf,
                                outcome: Err(EXPORT_BUSY_MESSAGE.into()),
                            });
                        } else {
                            export = Some(tokio::spawn(export_pdf_blocking(*result, out_dir.clone())));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        quit_pending = true;
                        if generation.is_some() || export.is_some() {
                            let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(
                                "Waiting for running work to finish…".into(),
                            )));
                            quit_deadline = Some(tokio::time::Instant::now() + Duration::from_secs(3));
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            joined = join_slot(&mut generation) => {
                generation = None;
                let outcome = joined.unwrap_or_else(|e| {
                    tracing::error!(error = %e, "generation task join failed");
                    Err(crate::engine::GENERATION_FAILED_MESSAGE.to_string())
                });
                let _ = event_tx.send(completion_event(&outcome));
            }
            joined = join_slot(&mut export) => {
                export = None;
                let outcome = match joined {
                    Ok(Ok(path)) => Ok(path),
                    Ok(Err(e)) => {
                        tracing::error!(error = %format!("{e:#}"), "PDF export failed");
                        Err(format!("{e:#}"))
                    }
                    Err(e) => Err(format!("PDF export task failed: {e}")),
                };
                let _ = event_tx.send(AppEvent::ExportFinished { kind: ExportKind::Pdf, outcome });
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = quit_deadline {
                    if tokio::time::Instant::now() >= deadline {
                        let _ = event_tx.send(AppEvent::Info(InfoEvent::StillWaiting));
                        quit_deadline = None;
                    }
                }
            }
        }
    }

    Ok(())
}
