// storefront-core/src/workflow/mod.rs

//! A small async step pipeline: named steps with `on`/`after` handlers,
//! early stop, and per-step failure policy.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineOutcome, PipelineResult};
pub use definition::Pipeline;
pub use step::{Handler, StepDef, StepPolicy};
