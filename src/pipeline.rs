//! Per-run logging handle shared by the pipeline stages.

use tracing::Span;
use uuid::Uuid;

/// One pipeline invocation. Every stage receives the run and logs inside its
/// span, so all lines of a run carry the same `run_id`.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    run_id: Uuid,
    span: Span,
}

impl PipelineRun {
    pub fn new(command: &'static str) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id, command);
        Self { run_id, span }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_get_distinct_ids() {
        let a = PipelineRun::new("stage");
        let b = PipelineRun::new("stage");
        assert_ne!(a.run_id(), b.run_id());
    }
}
