// storefront-core/src/workflow/definition.rs

//! The `Pipeline<TData, Err>` type and handler registration.

use crate::error::FlowError;
use crate::workflow::context_data::ContextData;
use crate::workflow::control::PipelineControl;
use crate::workflow::step::{Handler, StepDef, StepPolicy};
use std::collections::HashMap;
use std::future::Future;

/// An ordered list of named steps, each with `on` and `after` handlers,
/// run against a shared `ContextData<TData>`.
///
/// `Err` is the error type handlers return. It must absorb `FlowError` so the
/// engine can report its own failures (a required step with no handler) in
/// the caller's error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(step_defs: &[(&str, StepPolicy)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, policy)| StepDef {
        name: (*name).to_string(),
        policy: *policy,
      })
      .collect();

    Self {
      steps,
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn steps(&self) -> &[StepDef] {
    &self.steps
  }

  /// Panics on an unknown step name: that is a wiring mistake, not a runtime condition.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' is not defined.", step_name);
    }
  }

  fn box_handler<F, HandlerErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    })
  }

  /// Registers the main handler(s) of a step. Handlers run in registration order.
  pub fn on_root<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = Self::box_handler(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers a handler that runs after every `on` handler of the step succeeded.
  pub fn after_root<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = Self::box_handler(handler_fn);
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }
}
