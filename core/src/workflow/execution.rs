// storefront-core/src/workflow/execution.rs

use crate::error::FlowError;
use crate::workflow::context_data::ContextData;
use crate::workflow::control::{PipelineControl, PipelineOutcome, PipelineResult};
use crate::workflow::definition::Pipeline;
use crate::workflow::step::{Handler, StepPolicy};
use tracing::{event, instrument, span, Instrument, Level};

enum PhaseOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A failing `Required` step aborts the run with its error. A failing
  /// `BestEffort` step is logged and listed in `PipelineOutcome::degraded_steps`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineOutcome, Err> {
    let mut degraded_steps = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_name,
        step_index = step_idx,
        policy = ?step_def.policy
      );

      let on_handlers = self.on.get(step_name).filter(|v| !v.is_empty());
      let after_handlers = self.after.get(step_name).filter(|v| !v.is_empty());

      if on_handlers.is_none() && after_handlers.is_none() {
        match step_def.policy {
          StepPolicy::BestEffort => {
            event!(parent: &step_span, Level::DEBUG, "Best-effort step has no handlers, skipping.");
            continue;
          }
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
            return Err(Err::from(FlowError::HandlerMissing {
              step_name: step_def.name.clone(),
            }));
          }
        }
      }

      let mut phase = Self::run_phase(on_handlers, &ctx_data, "on").instrument(step_span.clone()).await;
      if matches!(phase, PhaseOutcome::Continue) {
        phase = Self::run_phase(after_handlers, &ctx_data, "after")
          .instrument(step_span.clone())
          .await;
      }

      match phase {
        PhaseOutcome::Continue => {
          event!(parent: &step_span, Level::DEBUG, "Step finished.");
        }
        PhaseOutcome::Stop => {
          event!(parent: &step_span, Level::INFO, "Pipeline stopped by a handler.");
          return Ok(PipelineOutcome {
            result: PipelineResult::Stopped,
            degraded_steps,
          });
        }
        PhaseOutcome::Failed(e) => match step_def.policy {
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, error = %e, "Required step failed.");
            return Err(e);
          }
          StepPolicy::BestEffort => {
            event!(parent: &step_span, Level::WARN, error = %e, "Best-effort step failed, continuing.");
            degraded_steps.push(step_def.name.clone());
          }
        },
      }
    }

    event!(Level::DEBUG, "Pipeline completed.");
    Ok(PipelineOutcome {
      result: PipelineResult::Completed,
      degraded_steps,
    })
  }

  async fn run_phase(
    handlers: Option<&Vec<Handler<TData, Err>>>,
    ctx_data: &ContextData<TData>,
    phase: &'static str,
  ) -> PhaseOutcome<Err> {
    let Some(handlers) = handlers else {
      return PhaseOutcome::Continue;
    };
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      event!(Level::TRACE, phase, handler_index = handler_idx, "Executing handler.");
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return PhaseOutcome::Stop,
        Err(e) => return PhaseOutcome::Failed(e),
      }
    }
    PhaseOutcome::Continue
  }
}
