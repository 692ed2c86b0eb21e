//! Predicate filters over the lead list.
//!
//! With no filter active the input passes through unchanged. With one or
//! more active, a lead is kept when it matches ANY active predicate. The OR
//! combination is deliberate and part of the contract.

use chrono::{DateTime, Duration, Utc};

use crate::model::Lead;

pub const HIGH_VALUE_THRESHOLD: f64 = 5000.0;
pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const STALE_AFTER_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadFilters {
    pub high_value: bool,
    pub recent: bool,
    pub stale: bool,
}

impl LeadFilters {
    pub fn any_active(&self) -> bool {
        self.high_value || self.recent || self.stale
    }
}

pub fn filter(leads: &[Lead], filters: &LeadFilters, now: DateTime<Utc>) -> Vec<Lead> {
    if !filters.any_active() {
        return leads.to_vec();
    }
    leads
        .iter()
        .filter(|lead| {
            (filters.high_value && lead.expected_revenue > HIGH_VALUE_THRESHOLD)
                || (filters.recent
                    && now - lead.created_at <= Duration::days(RECENT_WINDOW_DAYS))
                || (filters.stale
                    && now - lead.last_contact > Duration::days(STALE_AFTER_DAYS))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: i64, revenue: f64, created_days_ago: i64, contact_days_ago: i64) -> Lead {
        let now = Utc::now();
        Lead {
            id,
            name: format!("lead-{id}"),
            company: String::new(),
            email: String::new(),
            phone: String::new(),
            stage: "new".into(),
            expected_revenue: revenue,
            notes: String::new(),
            created_at: now - Duration::days(created_days_ago),
            last_contact: now - Duration::days(contact_days_ago),
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        let all = LeadFilters {
            high_value: true,
            recent: true,
            stale: true,
        };
        assert!(filter(&[], &all, Utc::now()).is_empty());
    }

    #[test]
    fn no_active_filter_is_identity() {
        let leads = vec![lead(1, 100.0, 30, 30), lead(2, 9000.0, 0, 0)];
        let out = filter(&leads, &LeadFilters::default(), Utc::now());
        assert_eq!(out, leads);
    }

    #[test]
    fn high_value_selects_exactly_above_threshold() {
        let leads = vec![
            lead(1, 5000.0, 30, 30),
            lead(2, 5000.01, 30, 30),
            lead(3, 12000.0, 30, 30),
        ];
        let filters = LeadFilters {
            high_value: true,
            ..Default::default()
        };
        let out = filter(&leads, &filters, Utc::now());
        let ids: Vec<i64> = out.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn active_filters_combine_with_or() {
        // id 1: only high value, id 2: only recent, id 3: neither.
        let leads = vec![lead(1, 9000.0, 30, 0), lead(2, 100.0, 1, 0), lead(3, 100.0, 30, 0)];
        let filters = LeadFilters {
            high_value: true,
            recent: true,
            ..Default::default()
        };
        let ids: Vec<i64> = filter(&leads, &filters, Utc::now())
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn stale_selects_old_contacts() {
        let leads = vec![lead(1, 0.0, 30, 15), lead(2, 0.0, 30, 13)];
        let filters = LeadFilters {
            stale: true,
            ..Default::default()
        };
        let ids: Vec<i64> = filter(&leads, &filters, Utc::now())
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn borderline_lead_passes_each_filter_then_identity() {
        // expectedRevenue just over the threshold, created now.
        let leads = vec![lead(1, 5000.01, 0, 0)];
        let now = Utc::now();

        let high = LeadFilters {
            high_value: true,
            ..Default::default()
        };
        assert_eq!(filter(&leads, &high, now).len(), 1);

        let recent = LeadFilters {
            recent: true,
            ..Default::default()
        };
        assert_eq!(filter(&leads, &recent, now).len(), 1);

        assert_eq!(filter(&leads, &LeadFilters::default(), now), leads);
    }
}
