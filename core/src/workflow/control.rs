// storefront-core/src/workflow/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by a handler: keep going, or end the run here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Ends the run after the current handler; later handlers and steps are not executed.
  Stop,
}

/// How a run ended when no required step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}

/// Result of `Pipeline::run` when no required step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
  pub result: PipelineResult,
  /// Best-effort steps whose handler failed, in execution order.
  pub degraded_steps: Vec<String>,
}

impl PipelineOutcome {
  pub fn is_completed(&self) -> bool {
    self.result == PipelineResult::Completed
  }

  pub fn is_degraded(&self) -> bool {
    !self.degraded_steps.is_empty()
  }
}
