//! Batch execution of the tool calls returned by one model response.
//!
//! Every call in a batch produces exactly one [`ToolResultPart`]: failures,
//! timeouts and panics inside a tool become structured error payloads so a
//! single broken tool never aborts the turn.
//!
//! ```rust
//! use serde_json::json;
//! use wprovider::{Message, Part, Role};
//! use wtooling::extract_tool_calls;
//!
//! let message = Message::new(
//!     Role::Model,
//!     vec![
//!         Part::tool_call("c1", "add", json!({"a": 1})),
//!         Part::tool_call("c1", "add", json!({"a": 1, "b": 2})),
//!     ],
//! );
//!
//! let calls = extract_tool_calls(&message);
//! assert_eq!(calls.len(), 1);
//! assert_eq!(calls[0].arguments, json!({"a": 1, "b": 2}));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::{FutureExt, StreamExt, stream};
use wprovider::{Message, Part, Role, ToolCallPart, ToolResultPart};

use crate::{ToolError, ToolExecutionContext, ToolRuntime};

/// Tool calls of `message` in order of appearance, deduplicated by id.
///
/// A repeated id keeps its first position; the later occurrence's arguments
/// replace the earlier ones unless they are null.
pub fn extract_tool_calls(message: &Message) -> Vec<ToolCallPart> {
    let mut calls: Vec<ToolCallPart> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for call in message.tool_calls() {
        match positions.get(&call.id) {
            Some(&position) => {
                if !call.arguments.is_null() {
                    calls[position].arguments = call.arguments.clone();
                }
            }
            None => {
                positions.insert(call.id.clone(), calls.len());
                calls.push(call.clone());
            }
        }
    }

    calls
}

/// Wraps one iteration's results into the single user-role history entry.
pub fn tool_result_message(results: Vec<ToolResultPart>) -> Message {
    Message::new(
        Role::User,
        results.into_iter().map(Part::ToolResult).collect(),
    )
}

#[derive(Clone)]
pub struct ToolBatchExecutor {
    runtime: Arc<dyn ToolRuntime>,
    max_concurrency: Option<usize>,
}

impl ToolBatchExecutor {
    pub fn new(runtime: Arc<dyn ToolRuntime>) -> Self {
        Self {
            runtime,
            max_concurrency: None,
        }
    }

    /// Caps the number of calls in flight at once. `None` or `0` is unbounded.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.filter(|limit| *limit > 0);
        self
    }

    pub fn runtime(&self) -> Arc<dyn ToolRuntime> {
        Arc::clone(&self.runtime)
    }

    /// Executes all calls concurrently and returns results in call order.
    pub async fn execute(
        &self,
        calls: Vec<ToolCallPart>,
        context: &ToolExecutionContext,
    ) -> Vec<ToolResultPart> {
        let size = calls.len();
        let futures = calls.into_iter().enumerate().map(|(index, call)| {
            self.execute_one(call, context.clone().with_batch_position(index, size))
        });

        match self.max_concurrency {
            Some(limit) => stream::iter(futures).buffered(limit).collect().await,
            None => join_all(futures).await,
        }
    }

    pub async fn execute_to_message(
        &self,
        calls: Vec<ToolCallPart>,
        context: &ToolExecutionContext,
    ) -> Message {
        tool_result_message(self.execute(calls, context).await)
    }

    async fn execute_one(
        &self,
        call: ToolCallPart,
        context: ToolExecutionContext,
    ) -> ToolResultPart {
        let id = call.id.clone();
        let name = call.name.clone();

        // A runtime may panic while building its future, not only while polling it.
        let runtime = &self.runtime;
        let outcome = AssertUnwindSafe(async move { runtime.execute(call, context).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result.output,
            Ok(Err(error)) => error.to_payload(),
            Err(panic) => ToolError::panicked(panic_message(panic.as_ref()))
                .with_tool_name(name.clone())
                .to_payload(),
        };

        ToolResultPart::new(id, name, result)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::{Value, json};
    use wprovider::ToolDefinition;

    use super::*;
    use crate::{DefaultToolRuntime, ToolExecutionResult, ToolFuture, ToolRegistry};

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, format!("{name} tool"), json!({"type": "object"}))
    }

    fn executor(registry: ToolRegistry) -> ToolBatchExecutor {
        ToolBatchExecutor::new(Arc::new(DefaultToolRuntime::new(Arc::new(registry))))
    }

    #[test]
    fn extraction_preserves_order_and_dedupes_by_id() {
        let message = Message::new(
            Role::Model,
            vec![
                Part::tool_call("a", "first", json!({"v": 1})),
                Part::text("thinking out loud"),
                Part::tool_call("b", "second", Value::Null),
                Part::tool_call("a", "first", json!({"v": 2})),
                Part::tool_call("b", "second", Value::Null),
            ],
        );

        let calls = extract_tool_calls(&message);

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[0].arguments, json!({"v": 2}));
        assert_eq!(calls[1].id, "b");
        assert!(calls[1].arguments.is_null());
    }

    #[tokio::test]
    async fn results_follow_call_order_even_when_completion_order_differs() {
        let mut registry = ToolRegistry::new();
        registry.register_fn(definition("slow"), |_args, _ctx| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!("slow"))
        });
        registry.register_fn(definition("fast"), |_args, _ctx| async move { Ok(json!("fast")) });

        let results = executor(registry)
            .execute(
                vec![
                    ToolCallPart::new("1", "slow", json!({})),
                    ToolCallPart::new("2", "fast", json!({})),
                ],
                &ToolExecutionContext::new("session"),
            )
            .await;

        let ids: Vec<&str> = results.iter().map(|result| result.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(results[0].result, json!("slow"));
        assert_eq!(results[1].result, json!("fast"));
    }

    #[tokio::test]
    async fn each_call_sees_its_slot_in_the_batch() {
        let mut registry = ToolRegistry::new();
        registry.register_sync_fn(definition("slot"), |_args, ctx| {
            Ok(json!(format!("{}#{}", ctx.iteration, ctx.batch)))
        });
        let context = ToolExecutionContext::new("session")
            .with_run_id("run-1")
            .with_iteration(4);

        let results = executor(registry)
            .execute(
                (0..3)
                    .map(|index| ToolCallPart::new(index.to_string(), "slot", json!({})))
                    .collect(),
                &context,
            )
            .await;

        let slots: Vec<Value> = results.into_iter().map(|result| result.result).collect();
        assert_eq!(slots, vec![json!("4#1/3"), json!("4#2/3"), json!("4#3/3")]);
    }

    #[tokio::test]
    async fn failures_and_panics_become_error_payloads() {
        let mut registry = ToolRegistry::new();
        registry.register_sync_fn(definition("fails"), |_args, _ctx| {
            Err(ToolError::execution("disk full"))
        });
        registry.register_sync_fn(definition("panics"), |_args, _ctx| panic!("kaboom"));
        registry.register_sync_fn(definition("ok"), |_args, _ctx| Ok(json!({"ok": true})));

        let message = executor(registry)
            .execute_to_message(
                vec![
                    ToolCallPart::new("1", "fails", json!({})),
                    ToolCallPart::new("2", "panics", json!({})),
                    ToolCallPart::new("3", "missing", json!({})),
                    ToolCallPart::new("4", "ok", json!({})),
                ],
                &ToolExecutionContext::new("session"),
            )
            .await;

        assert_eq!(message.role, Role::User);
        let results: Vec<&ToolResultPart> = message.tool_results().collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].result, json!({"error": "execution", "message": "disk full"}));
        assert_eq!(results[1].result, json!({"error": "panicked", "message": "kaboom"}));
        assert_eq!(results[2].result["error"], json!("not_found"));
        assert!(results[2].is_error());
        assert_eq!(results[3].result, json!({"ok": true}));
        assert!(!results[3].is_error());
    }

    /// Panics inside `execute` itself, before any future exists.
    struct EagerPanicRuntime;

    impl ToolRuntime for EagerPanicRuntime {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![definition("eager")]
        }

        fn execute<'a>(
            &'a self,
            tool_call: ToolCallPart,
            _context: ToolExecutionContext,
        ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>> {
            panic!("could not start {}", tool_call.name)
        }
    }

    #[tokio::test]
    async fn panics_while_starting_a_call_become_error_payloads() {
        let results = ToolBatchExecutor::new(Arc::new(EagerPanicRuntime))
            .execute(
                vec![
                    ToolCallPart::new("1", "eager", json!({})),
                    ToolCallPart::new("2", "eager", json!({})),
                ],
                &ToolExecutionContext::new("session"),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].result,
            json!({"error": "panicked", "message": "could not start eager"})
        );
        assert_eq!(results[1].id, "2");
        assert!(results[1].is_error());
    }

    #[tokio::test]
    async fn bounded_concurrency_limits_calls_in_flight() {
        let in_flight = Arc::new(Mutex::new((0usize, 0usize)));
        let mut registry = ToolRegistry::new();
        let tracker = Arc::clone(&in_flight);
        registry.register_fn(definition("track"), move |_args, _ctx| {
            let tracker = Arc::clone(&tracker);
            async move {
                {
                    let mut guard = tracker.lock().expect("tracker lock");
                    guard.0 += 1;
                    guard.1 = guard.1.max(guard.0);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                tracker.lock().expect("tracker lock").0 -= 1;
                Ok(Value::Null)
            }
        });

        let calls = (0..6)
            .map(|index| ToolCallPart::new(index.to_string(), "track", json!({})))
            .collect();
        let results = executor(registry)
            .with_max_concurrency(Some(2))
            .execute(calls, &ToolExecutionContext::new("session"))
            .await;

        assert_eq!(results.len(), 6);
        let peak = in_flight.lock().expect("tracker lock").1;
        assert!(peak <= 2, "peak concurrency was {peak}");
    }
}
