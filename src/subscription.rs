//! Subscription plan gating and the auth context.
//!
//! Both are explicit objects handed to the pipeline at construction rather
//! than ambient globals.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Advanced,
}

impl Plan {
    /// Lead ceiling for the tier; `None` means unlimited.
    pub fn lead_limit(self) -> Option<usize> {
        match self {
            Plan::Free => Some(10),
            Plan::Pro => Some(100),
            Plan::Advanced => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    plan: Plan,
}

impl Subscription {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn lead_limit(&self) -> Option<usize> {
        self.plan.lead_limit()
    }

    /// Whether one more lead fits under the ceiling.
    pub fn allows(&self, lead_count: usize) -> bool {
        match self.plan.lead_limit() {
            Some(limit) => lead_count < limit,
            None => true,
        }
    }

    /// Usage as a whole percentage, capped at 100. Unlimited plans report 0.
    pub fn usage_percent(&self, lead_count: usize) -> u8 {
        match self.plan.lead_limit() {
            Some(limit) if limit > 0 => {
                let pct = (lead_count as f64 / limit as f64 * 100.0).round();
                pct.min(100.0) as u8
            }
            _ => 0,
        }
    }

    /// Free -> Pro -> Advanced; upgrading from Advanced is a no-op.
    pub fn upgrade(&mut self) -> Plan {
        self.plan = match self.plan {
            Plan::Free => Plan::Pro,
            Plan::Pro | Plan::Advanced => Plan::Advanced,
        };
        self.plan
    }
}

/// Current user identity. With no signed-in user, persistence is skipped.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    user: Option<String>,
}

impl AuthContext {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }

    pub fn can_persist(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_caps_at_ten_leads() {
        let sub = Subscription::new(Plan::Free);
        assert!(sub.allows(9));
        assert!(!sub.allows(10));
        assert!(!sub.allows(11));
    }

    #[test]
    fn advanced_tier_is_unlimited() {
        let sub = Subscription::new(Plan::Advanced);
        assert!(sub.allows(1_000_000));
        assert_eq!(sub.usage_percent(1_000_000), 0);
    }

    #[test]
    fn usage_percent_rounds_and_caps() {
        let sub = Subscription::new(Plan::Free);
        assert_eq!(sub.usage_percent(0), 0);
        assert_eq!(sub.usage_percent(7), 70);
        assert_eq!(sub.usage_percent(25), 100);
    }

    #[test]
    fn upgrade_walks_the_tiers() {
        let mut sub = Subscription::new(Plan::Free);
        assert_eq!(sub.upgrade(), Plan::Pro);
        assert_eq!(sub.upgrade(), Plan::Advanced);
        assert_eq!(sub.upgrade(), Plan::Advanced);
    }

    #[test]
    fn sign_out_blocks_persistence() {
        let mut auth = AuthContext::signed_in("demo");
        assert!(auth.can_persist());
        auth.sign_out();
        assert!(!auth.can_persist());
        assert_eq!(auth.current_user(), None);
    }
}
