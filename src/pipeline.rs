//! The authoritative in-memory board for the session.
//!
//! Every mutation follows the same shape: check, mutate in memory, save,
//! publish. Last writer wins; there is exactly one mutator thread.

use std::sync::mpsc::Receiver;

use chrono::Utc;
use tracing::{debug, info};

use crate::errors::Error;
use crate::events::{DataEvent, EventBus};
use crate::model::{Lead, LeadDraft, Stage, Task, TaskDraft, Theme};
use crate::store::Store;
use crate::subscription::{AuthContext, Plan, Subscription};

pub struct Pipeline {
    store: Store,
    bus: EventBus,
    subscription: Subscription,
    auth: AuthContext,
    leads: Vec<Lead>,
    stages: Vec<Stage>,
    tasks: Vec<Task>,
    theme: Theme,
}

impl Pipeline {
    /// Seeds the session from the store. A corrupt or missing document
    /// yields empty collections and the default stage set.
    pub fn open(store: Store, subscription: Subscription, auth: AuthContext) -> Self {
        let state = store.load_or_default();
        Self {
            store,
            bus: EventBus::new(),
            subscription,
            auth,
            leads: state.leads,
            stages: state.stages,
            tasks: state.tasks,
            theme: state.theme,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<DataEvent> {
        self.bus.subscribe()
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn sign_out(&mut self) {
        self.auth.sign_out();
    }

    pub fn upgrade_plan(&mut self) -> Plan {
        self.subscription.upgrade()
    }

    pub fn usage_percent(&self) -> u8 {
        self.subscription.usage_percent(self.leads.len())
    }

    pub fn lead(&self, id: i64) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn leads_in_stage(&self, stage_id: &str) -> Vec<&Lead> {
        self.leads.iter().filter(|l| l.stage == stage_id).collect()
    }

    // ---- leads ----------------------------------------------------------

    pub fn add_lead(&mut self, draft: LeadDraft) -> Result<i64, Error> {
        if !self.subscription.allows(self.leads.len()) {
            let limit = self.subscription.lead_limit().unwrap_or(usize::MAX);
            return Err(Error::LimitExceeded { limit });
        }
        validate_lead(&draft)?;
        if self.stage(&draft.stage).is_none() {
            return Err(Error::UnknownStage { id: draft.stage });
        }
        let now = Utc::now();
        let id = self.next_id(now.timestamp_millis());
        self.leads.push(Lead {
            id,
            name: draft.name.trim().to_string(),
            company: draft.company,
            email: draft.email,
            phone: draft.phone,
            stage: draft.stage,
            expected_revenue: draft.expected_revenue,
            notes: draft.notes,
            created_at: now,
            last_contact: now,
        });
        self.persist_leads()?;
        info!(lead = id, "lead added");
        self.bus.publish(DataEvent::LeadsUpdated);
        Ok(id)
    }

    pub fn update_lead(&mut self, lead: Lead) -> Result<(), Error> {
        if self.stage(&lead.stage).is_none() {
            return Err(Error::UnknownStage { id: lead.stage });
        }
        let slot = self
            .leads
            .iter_mut()
            .find(|l| l.id == lead.id)
            .ok_or(Error::UnknownLead { id: lead.id })?;
        *slot = lead;
        self.persist_leads()?;
        self.bus.publish(DataEvent::LeadsUpdated);
        Ok(())
    }

    pub fn remove_lead(&mut self, id: i64) -> Result<(), Error> {
        let before = self.leads.len();
        self.leads.retain(|l| l.id != id);
        if self.leads.len() == before {
            return Err(Error::UnknownLead { id });
        }
        self.persist_leads()?;
        info!(lead = id, "lead removed");
        self.bus.publish(DataEvent::LeadsUpdated);
        Ok(())
    }

    /// Reassigns a lead to another stage. Only the stage field changes.
    pub fn move_lead(&mut self, id: i64, stage_id: &str) -> Result<(), Error> {
        if self.stage(stage_id).is_none() {
            return Err(Error::UnknownStage {
                id: stage_id.to_string(),
            });
        }
        let lead = self
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(Error::UnknownLead { id })?;
        lead.stage = stage_id.to_string();
        self.persist_leads()?;
        self.bus.publish(DataEvent::LeadsUpdated);
        Ok(())
    }

    // ---- stages ---------------------------------------------------------

    pub fn add_stage(&mut self, name: &str, color: &str) -> Result<String, Error> {
        let id = crate::model::stage_id_from_name(name);
        if id.is_empty() {
            return Err(Error::validation("name", "stage name is required"));
        }
        if self.stage(&id).is_some() {
            return Err(Error::validation("name", format!("stage '{id}' already exists")));
        }
        self.stages.push(Stage {
            id: id.clone(),
            name: name.trim().to_string(),
            color: color.to_string(),
        });
        self.persist_stages()?;
        self.bus.publish(DataEvent::StagesUpdated);
        Ok(id)
    }

    /// Removes a stage and reassigns its leads to the first remaining stage,
    /// committing both collections in a single write. The last stage cannot
    /// be removed.
    pub fn remove_stage(&mut self, id: &str) -> Result<(), Error> {
        if self.stage(id).is_none() {
            return Err(Error::UnknownStage { id: id.to_string() });
        }
        if self.stages.len() == 1 {
            return Err(Error::LastStage);
        }
        self.stages.retain(|s| s.id != id);
        let fallback = self.stages[0].id.clone();
        let mut reassigned = 0usize;
        for lead in self.leads.iter_mut().filter(|l| l.stage == id) {
            lead.stage = fallback.clone();
            reassigned += 1;
        }
        if self.auth.can_persist() {
            self.store.save_pipeline(&self.stages, &self.leads)?;
        } else {
            debug!("no signed-in user, skipping save");
        }
        info!(stage = id, reassigned, "stage removed");
        self.bus.publish(DataEvent::StagesUpdated);
        if reassigned > 0 {
            self.bus.publish(DataEvent::LeadsUpdated);
        }
        Ok(())
    }

    /// Swaps the stage with its neighbor; moving past either end is a no-op.
    pub fn move_stage(&mut self, id: &str, direction: isize) -> Result<(), Error> {
        let pos = self
            .stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::UnknownStage { id: id.to_string() })?;
        let target = pos as isize + direction.signum();
        if target < 0 || target >= self.stages.len() as isize {
            return Ok(());
        }
        self.stages.swap(pos, target as usize);
        self.persist_stages()?;
        self.bus.publish(DataEvent::StagesUpdated);
        Ok(())
    }

    // ---- tasks ----------------------------------------------------------

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<i64, Error> {
        if draft.title.trim().is_empty() {
            return Err(Error::validation("title", "title is required"));
        }
        let id = self.next_id(Utc::now().timestamp_millis());
        self.tasks.push(Task {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority,
            completed: false,
            lead_id: draft.lead_id,
        });
        self.persist_tasks()?;
        self.bus.publish(DataEvent::TasksUpdated);
        Ok(id)
    }

    pub fn toggle_task(&mut self, id: i64) -> Result<bool, Error> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::UnknownTask { id })?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist_tasks()?;
        self.bus.publish(DataEvent::TasksUpdated);
        Ok(completed)
    }

    pub fn remove_task(&mut self, id: i64) -> Result<(), Error> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(Error::UnknownTask { id });
        }
        self.persist_tasks()?;
        self.bus.publish(DataEvent::TasksUpdated);
        Ok(())
    }

    // ---- theme ----------------------------------------------------------

    pub fn toggle_theme(&mut self) -> Result<Theme, Error> {
        self.theme = self.theme.toggled();
        if self.auth.can_persist() {
            self.store.save_theme(self.theme)?;
        }
        Ok(self.theme)
    }

    // ---- internals ------------------------------------------------------

    /// Ids are millisecond timestamps, bumped past any collision from rapid
    /// sequential adds.
    fn next_id(&self, seed: i64) -> i64 {
        let mut id = seed;
        while self.leads.iter().any(|l| l.id == id) || self.tasks.iter().any(|t| t.id == id) {
            id += 1;
        }
        id
    }

    fn persist_leads(&self) -> Result<(), Error> {
        if self.auth.can_persist() {
            self.store.save_leads(&self.leads)?;
        } else {
            debug!("no signed-in user, skipping save");
        }
        Ok(())
    }

    fn persist_stages(&self) -> Result<(), Error> {
        if self.auth.can_persist() {
            self.store.save_stages(&self.stages)?;
        } else {
            debug!("no signed-in user, skipping save");
        }
        Ok(())
    }

    fn persist_tasks(&self) -> Result<(), Error> {
        if self.auth.can_persist() {
            self.store.save_tasks(&self.tasks)?;
        } else {
            debug!("no signed-in user, skipping save");
        }
        Ok(())
    }
}

fn validate_lead(draft: &LeadDraft) -> Result<(), Error> {
    if draft.name.trim().is_empty() {
        return Err(Error::validation("name", "name is required"));
    }
    if !draft.email.is_empty() && !draft.email.contains('@') {
        return Err(Error::validation("email", "email must contain '@'"));
    }
    if !draft.expected_revenue.is_finite() || draft.expected_revenue < 0.0 {
        return Err(Error::validation(
            "expectedRevenue",
            "expected revenue must be a non-negative number",
        ));
    }
    Ok(())
}
