//! Dashboard aggregates, recomputed in one pass per call.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::Lead;

pub const QUALIFIED_STAGE: &str = "qualified";
pub const PROPOSAL_STAGE: &str = "proposal";
pub const WON_STAGE: &str = "won";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardMetrics {
    pub total: usize,
    pub new_this_week: usize,
    pub qualified: usize,
    pub proposals: usize,
    pub won: usize,
    pub won_revenue: f64,
    /// `round(won / total * 100)`; 0 for an empty list.
    pub conversion_rate: u32,
}

pub fn compute(leads: &[Lead], now: DateTime<Utc>) -> DashboardMetrics {
    let mut m = DashboardMetrics {
        total: leads.len(),
        ..Default::default()
    };
    for lead in leads {
        if now - lead.created_at <= Duration::days(7) {
            m.new_this_week += 1;
        }
        match lead.stage.as_str() {
            QUALIFIED_STAGE => m.qualified += 1,
            PROPOSAL_STAGE => m.proposals += 1,
            WON_STAGE => {
                m.won += 1;
                m.won_revenue += lead.expected_revenue;
            }
            _ => {}
        }
    }
    if m.total > 0 {
        m.conversion_rate = (m.won as f64 / m.total as f64 * 100.0).round() as u32;
    }
    m
}

/// One line of the exported report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// Calendar month, `YYYY-MM`.
    pub period: String,
    pub leads: usize,
    pub revenue: f64,
    pub conversion: u32,
}

/// Report rows grouped by the month each lead was created in, oldest first.
pub fn monthly_report(leads: &[Lead]) -> Vec<ReportRow> {
    let mut months: BTreeMap<String, (usize, f64, usize)> = BTreeMap::new();
    for lead in leads {
        let period = lead.created_at.format("%Y-%m").to_string();
        let entry = months.entry(period).or_default();
        entry.0 += 1;
        entry.1 += lead.expected_revenue;
        if lead.stage == WON_STAGE {
            entry.2 += 1;
        }
    }
    months
        .into_iter()
        .map(|(period, (count, revenue, won))| ReportRow {
            period,
            leads: count,
            revenue,
            conversion: if count > 0 {
                (won as f64 / count as f64 * 100.0).round() as u32
            } else {
                0
            },
        })
        .collect()
}
