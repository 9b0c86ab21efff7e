//! Streaming orchestration loop over a chat model and a tool runtime.
//!
//! A run alternates between streaming one model call and executing the tool
//! calls that call produced, until the model answers without tools, returns
//! nothing actionable, or the iteration ceiling is reached. Every history
//! entry the run appends is surfaced in exactly one [`StreamingChunk`].

use std::sync::Arc;
use std::time::Instant;

use async_stream::try_stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use wprovider::{ChatModel, FinishReason, ModelRequest};
use wtooling::{
    DefaultToolRuntime, ToolBatchExecutor, ToolExecutionContext, ToolRegistry, ToolRuntime,
    tool_result_message,
};

use crate::{
    CallPlan, ChatChunkStream, ChatError, ChatErrorPhase, ChatResultAccumulator, ChatRunResult,
    ITERATION_LIMIT_KEY, IterationStep, NoopOrchestrationHooks, OrchestrationHooks,
    OrchestrationStrategy, RunRequest, RunShape, StrategyKind, StreamingChunk, StreamingState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorPolicy {
    /// Upper bound on model calls per run.
    pub max_iterations: u32,
    /// Upper bound on tool calls in flight per iteration; `None` is unbounded.
    pub max_concurrent_tools: Option<usize>,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            max_concurrent_tools: None,
        }
    }
}

impl OrchestratorPolicy {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_max_concurrent_tools(mut self, max_concurrent_tools: usize) -> Self {
        self.max_concurrent_tools = Some(max_concurrent_tools);
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.max_iterations == 0 {
            return Err(ChatError::configuration(
                "max_iterations must be greater than zero",
            ));
        }

        if self.max_concurrent_tools == Some(0) {
            return Err(ChatError::configuration(
                "max_concurrent_tools must be greater than zero when set",
            ));
        }

        Ok(())
    }
}

pub struct ChatOrchestratorBuilder {
    model: Arc<dyn ChatModel>,
    tools: Option<Arc<dyn ToolRuntime>>,
    strategy: Option<Arc<dyn OrchestrationStrategy>>,
    policy: OrchestratorPolicy,
    hooks: Arc<dyn OrchestrationHooks>,
}

impl ChatOrchestratorBuilder {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            tools: None,
            strategy: None,
            policy: OrchestratorPolicy::default(),
            hooks: Arc::new(NoopOrchestrationHooks),
        }
    }

    pub fn tool_runtime(mut self, runtime: Arc<dyn ToolRuntime>) -> Self {
        self.tools = Some(runtime);
        self
    }

    pub fn tool_registry(self, registry: ToolRegistry) -> Self {
        self.tool_runtime(Arc::new(DefaultToolRuntime::new(Arc::new(registry))))
    }

    /// Overrides the strategy otherwise derived from the model's capabilities.
    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.strategy = Some(kind.into_strategy());
        self
    }

    pub fn custom_strategy(mut self, strategy: Arc<dyn OrchestrationStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn policy(mut self, policy: OrchestratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.policy.max_iterations = max_iterations;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn OrchestrationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator, ChatError> {
        self.policy.validate()?;

        let strategy = self.strategy.unwrap_or_else(|| {
            StrategyKind::for_capabilities(&self.model.capabilities()).into_strategy()
        });
        let runtime = self
            .tools
            .unwrap_or_else(|| Arc::new(DefaultToolRuntime::default()));
        let executor =
            ToolBatchExecutor::new(runtime).with_max_concurrency(self.policy.max_concurrent_tools);

        Ok(ChatOrchestrator {
            model: self.model,
            executor,
            strategy,
            policy: self.policy,
            hooks: self.hooks,
        })
    }
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    model: Arc<dyn ChatModel>,
    executor: ToolBatchExecutor,
    strategy: Arc<dyn OrchestrationStrategy>,
    policy: OrchestratorPolicy,
    hooks: Arc<dyn OrchestrationHooks>,
}

impl ChatOrchestrator {
    pub fn builder(model: Arc<dyn ChatModel>) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::new(model)
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn policy(&self) -> OrchestratorPolicy {
        self.policy
    }

    /// Starts a run. Request and capability problems are reported here,
    /// before any model call; everything else surfaces through the stream.
    pub fn run(&self, request: RunRequest) -> Result<ChatChunkStream<'_>, ChatError> {
        request
            .validate()
            .map_err(|error| error.with_phase(ChatErrorPhase::Setup))?;

        let (tools, executor) = if request.tools_enabled {
            (self.executor.runtime().definitions(), self.executor.clone())
        } else {
            // calls the model makes anyway resolve to not_found payloads
            let empty: Arc<dyn ToolRuntime> = Arc::new(DefaultToolRuntime::default());
            (Vec::new(), ToolBatchExecutor::new(empty))
        };
        let shape = RunShape {
            tools: !tools.is_empty(),
            output_schema: request.output_schema.is_some(),
        };
        self.check_capabilities(shape)?;

        let history = request.initial_history();
        let RunRequest {
            session_id,
            run_id,
            trace_id,
            output_schema,
            options,
            metadata,
            ..
        } = request;

        let stream = try_stream! {
            let mut state = StreamingState::new(history, shape);
            self.strategy.initialize(&mut state);
            self.hooks.on_run_start(&run_id, self.strategy.kind());

            let finish_reason = loop {
                if state.iteration() >= self.policy.max_iterations {
                    tracing::warn!(
                        run_id = %run_id,
                        max_iterations = self.policy.max_iterations,
                        "run stopped at iteration limit"
                    );
                    let mut limit = StreamingChunk::default()
                        .with_id(format!("{run_id}-limit"))
                        .with_finish_reason(FinishReason::Length)
                        .with_metadata(ITERATION_LIMIT_KEY, true);
                    limit.metadata.extend(self.strategy.closing_metadata(&state));
                    yield limit;
                    break FinishReason::Length;
                }

                let iteration = state.begin_iteration();
                let phase = state.phase();
                let chunk_id = format!("{run_id}-{iteration}");
                let plan = self.strategy.before_model_call(
                    &state,
                    CallPlan {
                        tools: tools.clone(),
                        output_schema: output_schema.clone(),
                    },
                );
                let model_request = ModelRequest {
                    messages: state.history().to_vec(),
                    tools: plan.tools,
                    output_schema: plan.output_schema,
                    options: options.clone(),
                    metadata: metadata.clone(),
                };

                self.hooks.on_model_call(&run_id, iteration, phase);
                let surface_text = self.strategy.allow_text_streaming(&state);
                let mut chunks = self.model.stream(model_request).await.map_err(|error| {
                    self.fail(&run_id, ChatError::from(error).with_phase(ChatErrorPhase::ModelCall))
                })?;

                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk.map_err(|error| {
                        self.fail(&run_id, ChatError::from(error).with_phase(ChatErrorPhase::Streaming))
                    })?;
                    state.accumulate(&chunk);

                    if surface_text {
                        yield StreamingChunk {
                            id: if chunk.id.is_empty() { chunk_id.clone() } else { chunk.id.clone() },
                            output_text: chunk.text_delta(),
                            messages: Vec::new(),
                            thinking: chunk.thinking.clone(),
                            finish_reason: chunk.finish_reason,
                            metadata: chunk.metadata.clone(),
                            usage: chunk.usage,
                        };
                    } else {
                        state.suppress_chunk(&chunk);
                    }
                }
                drop(chunks);

                let call_finish = state.accumulated().finish_reason();
                let call_usage = state.accumulated().usage();
                let message = state.take_accumulated();
                let step = self.strategy.process_iteration(&mut state, message);

                if state.phase() != phase {
                    self.hooks.on_phase_change(&run_id, phase, state.phase());
                }

                let final_reason = if call_finish.is_specified() {
                    call_finish
                } else {
                    FinishReason::Stop
                };

                match step {
                    IterationStep::Empty => {
                        let mut closing = StreamingChunk::default()
                            .with_id(chunk_id)
                            .with_finish_reason(final_reason);
                        closing.usage = call_usage;
                        closing.metadata = self.strategy.closing_metadata(&state);
                        yield closing;
                        break final_reason;
                    }
                    IterationStep::Finish(message) => {
                        state.append_to_history(message.clone());
                        let mut closing = StreamingChunk::message(message)
                            .with_id(chunk_id)
                            .with_finish_reason(final_reason);
                        closing.usage = call_usage;
                        yield closing;
                        break final_reason;
                    }
                    IterationStep::ExecuteTools { message, calls } => {
                        state.append_to_history(message.clone());
                        yield StreamingChunk::message(message)
                            .with_id(chunk_id.clone())
                            .with_finish_reason(FinishReason::ToolCalls);

                        let mut context = ToolExecutionContext::new(session_id.clone())
                            .with_run_id(run_id.clone())
                            .with_iteration(iteration);
                        context.trace_id = trace_id.clone();

                        self.hooks.on_tool_batch_start(&run_id, iteration, &calls);
                        let started = Instant::now();
                        let results = executor.execute(calls, &context).await;
                        self.hooks
                            .on_tool_batch_complete(&run_id, iteration, &results, started.elapsed());

                        let results_message = tool_result_message(results);
                        state.append_to_history(results_message.clone());
                        yield StreamingChunk::message(results_message).with_id(chunk_id);
                    }
                    IterationStep::Continue => {}
                }
            };

            self.hooks
                .on_run_complete(&run_id, state.iteration(), finish_reason);
        };

        Ok(Box::pin(stream))
    }

    /// Drains a run into its consolidated result.
    pub async fn run_to_completion(&self, request: RunRequest) -> Result<ChatRunResult, ChatError> {
        let mut stream = self.run(request)?;
        let mut accumulator = ChatResultAccumulator::new();

        while let Some(chunk) = stream.next().await {
            accumulator.add(&chunk?);
        }

        Ok(accumulator.build())
    }

    /// Runs to completion and parses the final answer as `T`.
    pub async fn run_for<T>(&self, request: RunRequest) -> Result<T, ChatError>
    where
        T: DeserializeOwned,
    {
        let result = self.run_to_completion(request).await?;
        result
            .parse_output()
            .map_err(|error| error.with_phase(ChatErrorPhase::Finalize))
    }

    fn check_capabilities(&self, shape: RunShape) -> Result<(), ChatError> {
        let capabilities = self.model.capabilities();
        let name = self.model.name();

        if shape.tools && !capabilities.tools {
            return Err(ChatError::configuration(format!(
                "model '{name}' does not support tools; disable tools for this run"
            ))
            .with_phase(ChatErrorPhase::Setup));
        }

        if shape.output_schema && !capabilities.output_schema {
            return Err(ChatError::configuration(format!(
                "model '{name}' does not support structured output"
            ))
            .with_phase(ChatErrorPhase::Setup));
        }

        if shape.tools
            && shape.output_schema
            && !capabilities.tools_with_output_schema
            && self.strategy.kind() != StrategyKind::DualPhase
        {
            return Err(ChatError::configuration(format!(
                "model '{name}' cannot combine tools and structured output in one request; \
                 use the dual-phase strategy"
            ))
            .with_phase(ChatErrorPhase::Setup));
        }

        Ok(())
    }

    fn fail(&self, run_id: &wcommon::RunId, error: ChatError) -> ChatError {
        self.hooks.on_run_failure(run_id, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wprovider::{
        BoxedChunkStream, Message, ModelCapabilities, ModelChunk, ProviderError, ProviderFuture,
        Role, ToolDefinition, Usage, VecChunkStream,
    };
    use wtooling::ToolError;

    use super::*;
    use crate::{
        ChatErrorKind, SUPPRESSED_TEXT_KEY, SUPPRESSED_THINKING_KEY, SUPPRESSED_TOOL_CALLS_KEY,
        WorkflowPhase,
    };

    type Script = Vec<Result<ModelChunk, ProviderError>>;

    struct ScriptedModel {
        capabilities: ModelCapabilities,
        scripts: Mutex<VecDeque<Script>>,
        fallback: Option<Script>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        fn new(capabilities: ModelCapabilities, scripts: Vec<Script>) -> Self {
            Self {
                capabilities,
                scripts: Mutex::new(scripts.into()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn repeating(capabilities: ModelCapabilities, script: Script) -> Self {
            Self {
                fallback: Some(script),
                ..Self::new(capabilities, Vec::new())
            }
        }

        fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> ModelCapabilities {
            self.capabilities
        }

        fn stream<'a>(
            &'a self,
            request: ModelRequest,
        ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
            Box::pin(async move {
                self.requests.lock().expect("requests lock").push(request);
                let script = self
                    .scripts
                    .lock()
                    .expect("scripts lock")
                    .pop_front()
                    .or_else(|| self.fallback.clone())
                    .unwrap_or_default();

                Ok(Box::pin(VecChunkStream::new(script)) as BoxedChunkStream<'a>)
            })
        }
    }

    fn counting_registry(invocations: Arc<AtomicUsize>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_sync_fn(
            ToolDefinition::new("lookup", "Looks things up", json!({"type": "object"})),
            move |args, _ctx| {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"found": args["q"].clone()}))
            },
        );
        registry.register_sync_fn(
            ToolDefinition::new("broken", "Always fails", json!({"type": "object"})),
            |_args, _ctx| Err(ToolError::execution("backend offline")),
        );
        registry
    }

    fn tool_round(id: &str, query: &str) -> Script {
        vec![
            Ok(ModelChunk::text("let me check ")),
            Ok(ModelChunk::tool_call(id, "lookup", json!({"q": query}))
                .with_finish_reason(FinishReason::ToolCalls)),
        ]
    }

    fn answer(text: &str) -> Script {
        vec![
            Ok(ModelChunk::text(text)),
            Ok(ModelChunk::default()
                .with_finish_reason(FinishReason::Stop)
                .with_usage(Usage::new(10, 5))),
        ]
    }

    async fn drain(stream: ChatChunkStream<'_>) -> Vec<Result<StreamingChunk, ChatError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn n_tool_rounds_take_n_plus_one_model_calls() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![tool_round("c1", "a"), tool_round("c2", "b"), tool_round("c3", "c"), answer("done")],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(invocations.clone()))
            .build()
            .expect("orchestrator should build");

        let chunks = drain(
            orchestrator
                .run(RunRequest::new("s1").with_prompt("find a, b, c"))
                .expect("run should start"),
        )
        .await;
        let chunks: Vec<StreamingChunk> = chunks
            .into_iter()
            .map(|chunk| chunk.expect("chunk should be ok"))
            .collect();

        assert_eq!(model.requests().len(), 4);
        assert_eq!(invocations.load(Ordering::SeqCst), 3);

        let surfaced: Vec<Message> = chunks
            .iter()
            .flat_map(|chunk| chunk.messages.iter().cloned())
            .collect();
        assert_eq!(surfaced.len(), 7);
        assert_eq!(surfaced[1].role, Role::User);
        assert_eq!(surfaced[1].tool_results().next().map(|r| r.id.as_str()), Some("c1"));
        assert_eq!(surfaced[6].text(), "done");

        let last_request = &model.requests()[3];
        assert_eq!(last_request.messages.len(), 7);
        assert_eq!(&last_request.messages[1..], &surfaced[..6]);
    }

    #[tokio::test]
    async fn consolidated_result_matches_surfaced_chunks() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![tool_round("c1", "a"), answer("all done")],
        ));
        let orchestrator = ChatOrchestrator::builder(model)
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s2").with_prompt("go"))
            .await
            .expect("run should complete");

        assert_eq!(result.output_text, "let me check all done");
        assert_eq!(result.messages.len(), 3);
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.usage, Some(Usage::new(10, 5)));
        assert!(!result.iteration_limit_reached());
        assert_eq!(result.final_message().map(Message::text).as_deref(), Some("all done"));
    }

    #[tokio::test]
    async fn empty_response_terminates_without_tool_execution() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![vec![Ok(ModelChunk::text("   "))], answer("never reached")],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(invocations.clone()))
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s3").with_prompt("hello?"))
            .await
            .expect("run should complete");

        assert_eq!(model.requests().len(), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert!(result.messages.is_empty());
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn failing_tool_becomes_error_payload_and_run_continues() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![
                vec![Ok(ModelChunk::tool_call("c1", "broken", json!({})))],
                answer("recovered"),
            ],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s4").with_prompt("try it"))
            .await
            .expect("run should complete");

        let tool_result = result.messages[1]
            .tool_results()
            .next()
            .expect("tool result should exist");
        assert_eq!(
            tool_result.result,
            json!({"error": "execution", "message": "backend offline"})
        );
        assert_eq!(model.requests().len(), 2);
        assert_eq!(result.final_message().map(Message::text).as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn dual_phase_hands_suppressed_content_to_the_final_message() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::tools_xor_schema(),
            vec![
                tool_round("c1", "weather"),
                vec![Ok(ModelChunk::text("It is sunny.").with_metadata("grounded", true))],
                answer("{\"sky\":\"sunny\"}"),
            ],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .build()
            .expect("orchestrator should build");
        assert_eq!(orchestrator.strategy_kind(), StrategyKind::DualPhase);

        let result = orchestrator
            .run_to_completion(
                RunRequest::new("s5")
                    .with_prompt("weather?")
                    .with_output_schema(json!({"type": "object"})),
            )
            .await
            .expect("run should complete");

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[0].tools.is_empty() && requests[0].output_schema.is_none());
        assert!(!requests[1].tools.is_empty() && requests[1].output_schema.is_none());
        assert!(requests[2].tools.is_empty() && requests[2].output_schema.is_some());
        // phase one's closing text never reaches history
        assert_eq!(requests[2].messages.len(), 3);

        assert_eq!(result.output_text, "{\"sky\":\"sunny\"}");
        assert_eq!(result.messages.len(), 3);
        let last = result.final_message().expect("final message");
        assert_eq!(last.text(), "{\"sky\":\"sunny\"}");
        assert_eq!(
            last.metadata[SUPPRESSED_TEXT_KEY],
            json!("let me check It is sunny.")
        );
        assert_eq!(last.metadata[SUPPRESSED_TOOL_CALLS_KEY]["grounded"], json!(true));
        assert_eq!(
            last.metadata[SUPPRESSED_TOOL_CALLS_KEY]["tool_calls"][0]["name"],
            json!("lookup")
        );
        assert_eq!(result.suppressed_text(), Some("let me check It is sunny."));
    }

    #[tokio::test]
    async fn dual_phase_without_schema_runs_single_phase() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::tools_xor_schema(),
            vec![answer("plain")],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s6").with_prompt("hi"))
            .await
            .expect("run should complete");

        assert_eq!(result.output_text, "plain");
        assert!(result.suppressed_text().is_none());
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn capability_misuse_is_rejected_before_any_model_call() {
        let model = Arc::new(ScriptedModel::new(ModelCapabilities::text_only(), vec![]));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .build()
            .expect("orchestrator should build");

        let error = orchestrator
            .run(
                RunRequest::new("s7")
                    .with_prompt("json please")
                    .with_output_schema(json!({"type": "object"})),
            )
            .err()
            .expect("run should be rejected");
        assert_eq!(error.kind, ChatErrorKind::Configuration);
        assert_eq!(error.phase, Some(ChatErrorPhase::Setup));

        let split = Arc::new(ScriptedModel::new(ModelCapabilities::tools_xor_schema(), vec![]));
        let forced_default = ChatOrchestrator::builder(split.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .strategy(StrategyKind::Default)
            .build()
            .expect("orchestrator should build");
        let error = forced_default
            .run(
                RunRequest::new("s7")
                    .with_prompt("json please")
                    .with_output_schema(json!({"type": "object"})),
            )
            .err()
            .expect("run should be rejected");
        assert_eq!(error.kind, ChatErrorKind::Configuration);

        assert!(model.requests().is_empty());
        assert!(split.requests().is_empty());
    }

    #[tokio::test]
    async fn iteration_limit_ends_the_run_with_a_marker() {
        let model = Arc::new(ScriptedModel::repeating(
            ModelCapabilities::full(),
            vec![Ok(ModelChunk::tool_call("", "lookup", json!({"q": "again"})))],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .max_iterations(3)
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s8").with_prompt("loop"))
            .await
            .expect("run should complete");

        assert_eq!(model.requests().len(), 3);
        assert!(result.iteration_limit_reached());
        assert_eq!(result.finish_reason, FinishReason::Length);
        // every tool call keeps its matching result
        assert_eq!(result.messages.len(), 6);
        let ids: Vec<String> = result
            .messages
            .iter()
            .flat_map(|message| message.tool_calls().map(|call| call.id.clone()))
            .collect();
        assert_eq!(ids, vec!["call_0_0", "call_1_0", "call_2_0"]);
    }

    #[tokio::test]
    async fn dual_phase_limit_after_tool_phase_keeps_suppressed_content() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::tools_xor_schema(),
            vec![
                tool_round("c1", "weather"),
                vec![Ok(ModelChunk::text("It is sunny.").with_thinking("enough data"))],
                answer("{\"sky\":\"sunny\"}"),
            ],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .max_iterations(2)
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(
                RunRequest::new("s8b")
                    .with_prompt("weather?")
                    .with_output_schema(json!({"type": "object"})),
            )
            .await
            .expect("run should complete");

        assert_eq!(model.requests().len(), 2);
        assert!(result.iteration_limit_reached());
        assert_eq!(result.finish_reason, FinishReason::Length);
        assert_eq!(result.output_text, "");
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.suppressed_text(), Some("let me check It is sunny."));
        assert_eq!(result.metadata[SUPPRESSED_THINKING_KEY], json!("enough data"));
        assert_eq!(
            result.metadata[SUPPRESSED_TOOL_CALLS_KEY]["tool_calls"][0]["name"],
            json!("lookup")
        );
    }

    #[tokio::test]
    async fn empty_response_reports_the_model_finish_reason() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![
                vec![Ok(ModelChunk::default().with_finish_reason(FinishReason::ContentFilter))],
                answer("never reached"),
            ],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(RunRequest::new("s3b").with_prompt("hello?"))
            .await
            .expect("run should complete");

        assert_eq!(model.requests().len(), 1);
        assert!(result.messages.is_empty());
        assert_eq!(result.finish_reason, FinishReason::ContentFilter);
    }

    #[tokio::test]
    async fn dual_phase_empty_output_phase_terminates_with_handoff() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::tools_xor_schema(),
            vec![
                vec![Ok(ModelChunk::text("It is sunny."))],
                vec![Ok(ModelChunk::text("  ").with_finish_reason(FinishReason::Stop))],
                answer("never reached"),
            ],
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(invocations.clone()))
            .build()
            .expect("orchestrator should build");

        let result = orchestrator
            .run_to_completion(
                RunRequest::new("s5b")
                    .with_prompt("weather?")
                    .with_output_schema(json!({"type": "object"})),
            )
            .await
            .expect("run should complete");

        assert_eq!(model.requests().len(), 2);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert!(result.messages.is_empty());
        assert!(!result.iteration_limit_reached());
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.suppressed_text(), Some("It is sunny."));
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_model_calls_and_tools() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(ScriptedModel::repeating(
            ModelCapabilities::full(),
            tool_round("", "again"),
        ));
        let orchestrator = ChatOrchestrator::builder(model.clone())
            .tool_registry(counting_registry(invocations.clone()))
            .build()
            .expect("orchestrator should build");

        let mut stream = orchestrator
            .run(RunRequest::new("s10").with_prompt("loop"))
            .expect("run should start");
        let first = stream
            .next()
            .await
            .expect("a chunk should arrive")
            .expect("chunk should be ok");
        assert_eq!(first.output_text, "let me check ");
        drop(stream);
        tokio::task::yield_now().await;

        assert_eq!(model.requests().len(), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_errors_end_the_stream() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![vec![
                Ok(ModelChunk::text("partial")),
                Err(ProviderError::stream_aborted("connection reset")),
            ]],
        ));
        let orchestrator = ChatOrchestrator::builder(model)
            .build()
            .expect("orchestrator should build");

        let chunks = drain(
            orchestrator
                .run(RunRequest::new("s9").with_prompt("hi"))
                .expect("run should start"),
        )
        .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].as_ref().map(|chunk| chunk.output_text.clone()),
            Ok("partial".to_string())
        );
        let error = chunks[1].clone().expect_err("second item should be an error");
        assert_eq!(error.kind, ChatErrorKind::Provider);
        assert_eq!(error.phase, Some(ChatErrorPhase::Streaming));
    }

    #[tokio::test]
    async fn run_for_parses_typed_output() {
        #[derive(Debug, serde::Deserialize)]
        struct Answer {
            value: u32,
        }

        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::full(),
            vec![answer("{\"value\":42}"), answer("nope")],
        ));
        let orchestrator = ChatOrchestrator::builder(model)
            .build()
            .expect("orchestrator should build");

        let parsed: Answer = orchestrator
            .run_for(
                RunRequest::new("s10")
                    .with_prompt("answer")
                    .with_output_schema(json!({"type": "object"})),
            )
            .await
            .expect("typed output should parse");
        assert_eq!(parsed.value, 42);

        let error = orchestrator
            .run_for::<Answer>(RunRequest::new("s10").with_prompt("again"))
            .await
            .expect_err("should not parse");
        assert_eq!(error.kind, ChatErrorKind::Output);
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHooks {
        fn push(&self, event: String) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    impl OrchestrationHooks for RecordingHooks {
        fn on_run_start(&self, _run_id: &wcommon::RunId, strategy: StrategyKind) {
            self.push(format!("start:{strategy:?}"));
        }

        fn on_model_call(&self, _run_id: &wcommon::RunId, iteration: u32, phase: WorkflowPhase) {
            self.push(format!("call:{iteration}:{phase:?}"));
        }

        fn on_phase_change(&self, _run_id: &wcommon::RunId, _from: WorkflowPhase, to: WorkflowPhase) {
            self.push(format!("phase:{to:?}"));
        }

        fn on_tool_batch_start(
            &self,
            _run_id: &wcommon::RunId,
            _iteration: u32,
            calls: &[wprovider::ToolCallPart],
        ) {
            self.push(format!("tools:{}", calls.len()));
        }

        fn on_run_complete(
            &self,
            _run_id: &wcommon::RunId,
            model_calls: u32,
            finish_reason: FinishReason,
        ) {
            self.push(format!("complete:{model_calls}:{finish_reason:?}"));
        }
    }

    #[tokio::test]
    async fn hooks_observe_the_dual_phase_lifecycle() {
        let model = Arc::new(ScriptedModel::new(
            ModelCapabilities::tools_xor_schema(),
            vec![tool_round("c1", "x"), answer("ok"), answer("{}")],
        ));
        let hooks = Arc::new(RecordingHooks::default());
        let orchestrator = ChatOrchestrator::builder(model)
            .tool_registry(counting_registry(Arc::new(AtomicUsize::new(0))))
            .hooks(hooks.clone())
            .build()
            .expect("orchestrator should build");

        orchestrator
            .run_to_completion(
                RunRequest::new("s11")
                    .with_prompt("go")
                    .with_output_schema(json!({"type": "object"})),
            )
            .await
            .expect("run should complete");

        let events = hooks.events.lock().expect("events lock").clone();
        assert_eq!(
            events,
            vec![
                "start:DualPhase",
                "call:0:ToolPhase",
                "tools:1",
                "call:1:ToolPhase",
                "phase:OutputPhase",
                "call:2:OutputPhase",
                "complete:3:Stop",
            ]
        );
    }

    #[test]
    fn policy_validation_rejects_zero_limits() {
        assert!(OrchestratorPolicy::default().validate().is_ok());
        assert!(OrchestratorPolicy::new(0).validate().is_err());
        assert!(
            OrchestratorPolicy::default()
                .with_max_concurrent_tools(0)
                .validate()
                .is_err()
        );

        let model = Arc::new(ScriptedModel::new(ModelCapabilities::full(), vec![]));
        let error = ChatOrchestrator::builder(model)
            .max_iterations(0)
            .build()
            .err()
            .expect("build should fail");
        assert_eq!(error.kind, ChatErrorKind::Configuration);
    }
}
