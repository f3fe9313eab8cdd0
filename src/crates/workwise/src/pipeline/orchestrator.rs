//! The stage driver.

use super::retry::retry_with_backoff;
use super::stage::{count_enumerated_steps, default_stages, StageDescriptor, StageInput, StageKind, StagePolicy};
use crate::agent::{CompletionOptions, ModelClient, ToolSet};
use crate::conversation::ConversationState;
use crate::error::{ClientError, ExtractionError, PipelineError, StageFailure};
use crate::extractor::extract;
use crate::step::WorkflowStep;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Result of a pipeline run that got through every stage.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Extracted steps; empty when extraction failed.
    pub steps: Vec<WorkflowStep>,

    /// Why the final reply could not be parsed, if it could not.
    pub failure: Option<ExtractionError>,

    /// Full conversation after the last stage.
    pub conversation: ConversationState,

    /// Steps the summarizer enumerated, when it numbered them.
    pub expected_steps: Option<usize>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs the analysis stages in order over one conversation.
///
/// Each stage appends its handoff messages, calls the model client and passes
/// the extended conversation on. A failing stage stops the run; no later
/// stage executes.
#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn ModelClient>,
    tools: ToolSet,
    stages: Vec<StageDescriptor>,
    options: CompletionOptions,
}

impl Pipeline {
    /// Pipeline with the default summarize → score → suggest chain.
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            tools: ToolSet::new(),
            stages: default_stages(),
            options: CompletionOptions::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_stages(mut self, stages: Vec<StageDescriptor>) -> Self {
        self.stages = stages;
        self
    }

    /// Options passed to every client call. Each stage suffixes the thread id
    /// with its name.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply one policy to every stage.
    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        for stage in &mut self.stages {
            stage.policy = policy.clone();
        }
        self
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Run every stage and extract the steps from the final reply.
    pub async fn run(
        &self,
        company_context: &str,
        conversation: ConversationState,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.run_with_cancel(company_context, conversation, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops with `Cancelled` once `cancel` fires,
    /// including while a stage call is in flight.
    pub async fn run_with_cancel(
        &self,
        company_context: &str,
        conversation: ConversationState,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let span = info_span!("pipeline", thread_id = %self.options.thread_id);
        self.drive(company_context, conversation, &cancel)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        company_context: &str,
        mut conversation: ConversationState,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();
        let mut expected_steps = None;

        for stage in &self.stages {
            if cancel.is_cancelled() {
                return Err(PipelineError::new(stage.kind, StageFailure::Cancelled));
            }

            let input = StageInput {
                company_context,
                conversation: &conversation,
                expected_steps,
            };
            let handoff = (stage.handoff)(&input);
            conversation.extend(handoff);

            conversation = self.run_stage(stage, conversation, cancel).await?;

            if stage.kind == StageKind::Summarize {
                expected_steps = conversation.last_text().and_then(count_enumerated_steps);
                info!(expected_steps = ?expected_steps, "summarizer enumerated steps");
            }
        }

        let raw = conversation.last_text().unwrap_or_default();
        let (steps, failure) = match extract(raw) {
            Ok(steps) => (steps, None),
            Err(e) => {
                warn!(reason = %e.kind, detail = %e.detail, "could not extract workflow steps");
                (Vec::new(), Some(e))
            }
        };

        if let Some(expected) = expected_steps {
            if failure.is_none() && steps.len() != expected {
                warn!(
                    expected,
                    extracted = steps.len(),
                    "step count changed between summarizer and final output"
                );
            }
        }

        info!(
            steps = steps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );

        Ok(PipelineOutcome {
            steps,
            failure,
            conversation,
            expected_steps,
        })
    }

    async fn run_stage(
        &self,
        stage: &StageDescriptor,
        conversation: ConversationState,
        cancel: &CancellationToken,
    ) -> Result<ConversationState, PipelineError> {
        let options = CompletionOptions {
            thread_id: format!("{}-{}", self.options.thread_id, stage.kind),
            ..self.options.clone()
        };
        let before = conversation.len();
        let started = Instant::now();
        info!(stage = %stage.kind, messages = before, "stage started");

        let attempts = retry_with_backoff(
            &stage.policy.retry,
            stage.kind.as_str(),
            ClientError::is_retryable,
            |attempt| {
                let conversation = conversation.clone();
                let options = &options;
                async move {
                    if attempt > 0 {
                        info!(stage = %stage.kind, attempt, "retrying stage");
                    }
                    let out = self
                        .client
                        .complete(conversation, &self.tools, &stage.instructions, options)
                        .await?;
                    if out.len() <= before {
                        return Err(ClientError::NoReply);
                    }
                    Ok(out)
                }
            },
        );

        let bounded = async {
            match stage.policy.timeout {
                Some(limit) => match tokio::time::timeout(limit, attempts).await {
                    Ok(result) => result.map_err(StageFailure::from),
                    Err(_) => Err(StageFailure::Timeout(limit)),
                },
                None => attempts.await.map_err(StageFailure::from),
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageFailure::Cancelled),
            result = bounded => result,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(out) => {
                info!(stage = %stage.kind, elapsed_ms, added = out.len() - before, "stage finished");
                Ok(out)
            }
            Err(cause) => {
                warn!(stage = %stage.kind, elapsed_ms, error = %cause, "stage failed");
                Err(PipelineError::new(stage.kind, cause))
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("tools", &self.tools)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm::Message;
    use std::sync::Mutex;

    /// Answers each stage with the next canned text.
    struct Canned(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl ModelClient for Canned {
        async fn complete(
            &self,
            mut conversation: ConversationState,
            _tools: &ToolSet,
            _role_instructions: &str,
            _options: &CompletionOptions,
        ) -> Result<ConversationState, ClientError> {
            let text = self.0.lock().unwrap().remove(0);
            conversation.push(Message::assistant(text));
            Ok(conversation)
        }
    }

    #[tokio::test]
    async fn test_happy_path_threads_conversation() {
        let client = Arc::new(Canned(Mutex::new(vec![
            "Step 1: Intake\nStep 2: Review",
            "Step 1: 4/10\nStep 2: 8/10",
            r#"[{"step_summary":"Intake","efficiency_score":4,"explanation":"Manual"},
                {"step_summary":"Review","efficiency_score":8,"explanation":"Fine"}]"#,
        ])));
        let outcome = Pipeline::new(client)
            .run("Acme", ConversationState::new())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.expected_steps, Some(2));
        // three handoff messages and three replies
        assert_eq!(outcome.conversation.len(), 6);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_not_an_error() {
        let client = Arc::new(Canned(Mutex::new(vec!["Step 1: A", "Step 1: 5", "Sorry, no JSON."])));
        let outcome = Pipeline::new(client)
            .run("Acme", ConversationState::new())
            .await
            .unwrap();

        assert!(outcome.steps.is_empty());
        assert_eq!(
            outcome.failure.map(|f| f.kind),
            Some(crate::error::ExtractionErrorKind::NoArrayFound)
        );
    }

    struct Silent;

    #[async_trait]
    impl ModelClient for Silent {
        async fn complete(
            &self,
            conversation: ConversationState,
            _tools: &ToolSet,
            _role_instructions: &str,
            _options: &CompletionOptions,
        ) -> Result<ConversationState, ClientError> {
            Ok(conversation)
        }
    }

    #[tokio::test]
    async fn test_client_without_reply_fails_stage() {
        let err = Pipeline::new(Arc::new(Silent))
            .run("Acme", ConversationState::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), StageKind::Summarize);
        assert!(matches!(err.cause, StageFailure::Client(ClientError::NoReply)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = Pipeline::new(Arc::new(Silent))
            .run_with_cancel("Acme", ConversationState::new(), token)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), StageKind::Summarize);
        assert!(matches!(err.cause, StageFailure::Cancelled));
    }
}
