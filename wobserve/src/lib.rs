//! Observability hooks for model calls, tool execution, and orchestration runs.
//!
//! ```rust
//! use wobserve::{
//!     MetricsObservabilityHooks, SafeOrchestrationHooks, SafeProviderHooks,
//!     TracingObservabilityHooks,
//! };
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _run_hooks = SafeOrchestrationHooks::new(MetricsObservabilityHooks);
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeOrchestrationHooks, SafeProviderHooks, SafeToolHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeOrchestrationHooks, SafeProviderHooks, SafeToolHooks,
        TracingObservabilityHooks,
    };
}
