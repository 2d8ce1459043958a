// storefront-core/src/workflow/step.rs

use crate::workflow::context_data::ContextData;
use crate::workflow::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// What a failing handler means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
  /// A handler error aborts the run and is returned to the caller.
  /// Having no handler at all is a configuration error.
  Required,
  /// A handler error is logged and the run moves on to the next step.
  /// Having no handler at all is fine.
  BestEffort,
}

#[derive(Debug, Clone)]
pub struct StepDef {
  pub name: String,
  pub policy: StepPolicy,
}

/// Boxed async step handler over `ContextData<TData>`.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>> + Send + Sync,
>;
