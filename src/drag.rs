//! Pick-up/drop state machine for moving a lead between stages.
//!
//! Two states: `Idle` and `Dragging` with the captured lead id. A drop onto
//! the lead's current stage is a deliberate no-op with no confirmation.
//! Ending a drag always returns to `Idle`, whatever the outcome.

use crate::errors::Error;
use crate::model::humanize_stage_id;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        lead_id: i64,
    },
}

#[derive(Debug, Default)]
pub struct DragHandler {
    state: DragState,
}

impl DragHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dragging(&self) -> Option<i64> {
        match self.state {
            DragState::Dragging { lead_id } => Some(lead_id),
            DragState::Idle => None,
        }
    }

    pub fn start(&mut self, lead_id: i64) {
        self.state = DragState::Dragging { lead_id };
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Resolves the drag onto `stage_id`. Returns the confirmation to show,
    /// or `None` when nothing moved (idle drop or same-stage drop).
    pub fn drop_on(
        &mut self,
        pipeline: &mut Pipeline,
        stage_id: &str,
    ) -> Result<Option<String>, Error> {
        let DragState::Dragging { lead_id } = self.state else {
            return Ok(None);
        };
        self.state = DragState::Idle;

        let lead = pipeline
            .lead(lead_id)
            .ok_or(Error::UnknownLead { id: lead_id })?;
        if lead.stage == stage_id {
            return Ok(None);
        }
        let name = lead.name.clone();
        pipeline.move_lead(lead_id, stage_id)?;
        Ok(Some(format!(
            "{name} moved to {}",
            humanize_stage_id(stage_id)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LeadDraft;
    use crate::store::Store;
    use crate::subscription::{AuthContext, Plan, Subscription};
    use tempfile::{tempdir, TempDir};

    fn pipeline_with_lead() -> (TempDir, Pipeline, i64) {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut pipe = Pipeline::open(
            store,
            Subscription::new(Plan::Pro),
            AuthContext::signed_in("demo"),
        );
        let id = pipe
            .add_lead(LeadDraft {
                name: "Acme".into(),
                stage: "new".into(),
                ..Default::default()
            })
            .unwrap();
        (dir, pipe, id)
    }

    #[test]
    fn start_captures_the_lead_and_cancel_clears_it() {
        let mut drag = DragHandler::new();
        assert_eq!(drag.state(), DragState::Idle);
        drag.start(42);
        assert_eq!(drag.dragging(), Some(42));
        drag.cancel();
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn drop_on_current_stage_is_a_no_op() {
        let (_dir, mut pipe, id) = pipeline_with_lead();
        let before = pipe.leads().to_vec();
        let mut drag = DragHandler::new();
        drag.start(id);
        let msg = drag.drop_on(&mut pipe, "new").unwrap();
        assert_eq!(msg, None);
        assert_eq!(pipe.leads(), before.as_slice());
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn drop_on_other_stage_moves_and_confirms() {
        let (_dir, mut pipe, id) = pipeline_with_lead();
        let mut drag = DragHandler::new();
        drag.start(id);
        let msg = drag.drop_on(&mut pipe, "qualified").unwrap();
        assert_eq!(msg.as_deref(), Some("Acme moved to Qualified"));
        assert_eq!(pipe.lead(id).unwrap().stage, "qualified");
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn confirmation_humanizes_underscored_stage_ids() {
        let (_dir, mut pipe, id) = pipeline_with_lead();
        pipe.add_stage("Follow Up", "yellow").unwrap();
        let mut drag = DragHandler::new();
        drag.start(id);
        let msg = drag.drop_on(&mut pipe, "follow_up").unwrap();
        assert_eq!(msg.as_deref(), Some("Acme moved to Follow Up"));
    }

    #[test]
    fn drop_while_idle_does_nothing() {
        let (_dir, mut pipe, _id) = pipeline_with_lead();
        let mut drag = DragHandler::new();
        assert_eq!(drag.drop_on(&mut pipe, "won").unwrap(), None);
    }

    #[test]
    fn failed_drop_still_ends_the_drag() {
        let (_dir, mut pipe, id) = pipeline_with_lead();
        let mut drag = DragHandler::new();
        drag.start(id);
        assert!(drag.drop_on(&mut pipe, "no_such_stage").is_err());
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(pipe.lead(id).unwrap().stage, "new");
    }
}
