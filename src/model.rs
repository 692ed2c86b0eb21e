use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A sales prospect tracked through the pipeline stages.
///
/// Field names are camelCased on disk so the persisted document matches the
/// documented external format (`expectedRevenue`, `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    /// Id of the pipeline stage this lead currently occupies.
    pub stage: String,
    pub expected_revenue: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
}

/// Form input for a new lead; the pipeline assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct LeadDraft {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub stage: String,
    pub expected_revenue: f64,
    pub notes: String,
}

/// A named, ordered phase of the pipeline. Position is array order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
    /// Optional back-reference to the lead this task belongs to.
    pub lead_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub lead_id: Option<i64>,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The stage set a fresh board starts with.
pub fn default_stages() -> Vec<Stage> {
    [
        ("new", "New", "blue"),
        ("contacted", "Contacted", "yellow"),
        ("qualified", "Qualified", "magenta"),
        ("proposal", "Proposal", "cyan"),
        ("won", "Won", "green"),
    ]
    .iter()
    .map(|(id, name, color)| Stage {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

/// Human-formats a stage id: underscore-separated tokens, each capitalized
/// ("follow_up" -> "Follow Up").
pub fn humanize_stage_id(id: &str) -> String {
    id.split('_')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives a stage id from a display name ("Follow Up" -> "follow_up").
pub fn stage_id_from_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
