mod gemini;
mod prompt;

pub use gemini::GeminiClient;

use crate::model::{AppEvent, GeneratedResult, GenerationRequest};
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Message shown to the user for any generation failure. Details go to the log.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate the design. Please try again.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured (set GEMINI_API_KEY or pass --api-key)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("the model returned no text")]
    EmptyResponse,
    #[error("response is not a valid design: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

/// Something that turns a request into a design. Implemented by the Gemini
/// client and by fakes in tests.
pub trait DesignGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        req: GenerationRequest,
    ) -> impl Future<Output = Result<GeneratedResult, GenerationError>> + Send;
}

/// Runs one generation and reports it as events.
pub struct DesignEngine<G> {
    generator: G,
}

impl<G: DesignGenerator> DesignEngine<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Run one generation. Failures are logged and mapped to the generic user-facing message.
    pub async fn generate(&self, req: GenerationRequest) -> Result<GeneratedResult, String> {
        match self.generator.generate(req).await {
            Ok(result) => {
                tracing::info!(
                    width = %result.width,
                    height = %result.height,
                    svg_bytes = result.svg_content.len(),
                    "design generated"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                Err(GENERATION_FAILED_MESSAGE.to_string())
            }
        }
    }

    /// Emits `GenerationStarted`, then exactly one of `GenerationCompleted` or
    /// `GenerationFailed`. Returns the user-facing outcome.
    pub async fn run(
        &self,
        req: GenerationRequest,
        event_tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<GeneratedResult, String> {
        let _ = event_tx.send(AppEvent::GenerationStarted);
        let outcome = self.generate(req).await;
        let _ = event_tx.send(completion_event(&outcome));
        outcome
    }
}

/// The event reporting a finished generation.
pub fn completion_event(outcome: &Result<GeneratedResult, String>) -> AppEvent {
    match outcome {
        Ok(result) => AppEvent::GenerationCompleted {
            result: Box::new(result.clone()),
        },
        Err(message) => AppEvent::GenerationFailed {
            message: message.clone(),
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Scripted generator: returns the configured outcome after an optional delay.
    #[derive(Clone)]
    pub(crate) struct FakeGenerator {
        pub outcome: Arc<dyn Fn(&GenerationRequest) -> Result<GeneratedResult, GenerationError> + Send + Sync>,
        pub delay: Duration,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeGenerator {
        pub(crate) fn ok(result: GeneratedResult) -> Self {
            Self {
                outcome: Arc::new(move |_| Ok(result.clone())),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn empty() -> Self {
            Self {
                outcome: Arc::new(|_| Err(GenerationError::EmptyResponse)),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DesignGenerator for FakeGenerator {
        async fn generate(
            &self,
            req: GenerationRequest,
        ) -> Result<GeneratedResult, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.outcome)(&req)
        }
    }

    pub(crate) fn sample_result() -> GeneratedResult {
        GeneratedResult {
            svg_content: concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="40mm" height="20mm" viewBox="0 0 40 20">"#,
                r##"<rect x="1" y="1" width="38" height="18" fill="none" stroke="#FF0000" stroke-width="0.1"/>"##,
                r##"<circle cx="20" cy="10" r="5" fill="#000000"/>"##,
                "</svg>"
            )
            .to_string(),
            description: "A rectangular tag with an engraved dot.".into(),
            width: "40mm".into(),
            height: "20mm".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{sample_result, FakeGenerator};
    use super::*;
    use crate::model::{AppMode, GeneratorSettings};

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "tag".into(),
            mode: AppMode::TwoD,
            settings: GeneratorSettings::default(),
        }
    }

    #[tokio::test]
    async fn success_emits_started_then_completed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = DesignEngine::new(FakeGenerator::ok(sample_result()));
        let out = engine.run(request(), &tx).await;
        assert_eq!(out, Ok(sample_result()));

        assert!(matches!(rx.recv().await, Some(AppEvent::GenerationStarted)));
        match rx.recv().await {
            Some(AppEvent::GenerationCompleted { result }) => assert_eq!(*result, sample_result()),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failure_maps_to_generic_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = DesignEngine::new(FakeGenerator::empty());
        let out = engine.run(request(), &tx).await;
        assert_eq!(out, Err(GENERATION_FAILED_MESSAGE.to_string()));

        assert!(matches!(rx.recv().await, Some(AppEvent::GenerationStarted)));
        match rx.recv().await {
            Some(AppEvent::GenerationFailed { message }) => {
                assert_eq!(message, GENERATION_FAILED_MESSAGE)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
