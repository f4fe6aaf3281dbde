//! Display projection of a Trello card

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// The card fields the board summary shows.
///
/// Built leniently: a missing or mistyped field becomes `None` or empty, the
/// raw card stays in the snapshot untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub name: String,
    pub list_id: Option<String>,
    pub due: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub comment_count: usize,
}

impl CardSummary {
    pub fn from_value(card: &Value) -> Self {
        let text = |field: &str| card.get(field).and_then(Value::as_str);

        let labels = card
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|label| {
                        let name = label.get("name").and_then(Value::as_str).unwrap_or("");
                        if name.is_empty() {
                            label.get("color").and_then(Value::as_str)
                        } else {
                            Some(name)
                        }
                    })
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let comment_count = card
            .get("actions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|a| a.get("type").and_then(Value::as_str) == Some("commentCard"))
                    .count()
            })
            .unwrap_or(0);

        Self {
            name: text("name").unwrap_or("(untitled)").to_string(),
            list_id: text("idList").map(str::to_string),
            due: text("due").and_then(parse_timestamp),
            last_activity: text("dateLastActivity").and_then(parse_timestamp),
            labels,
            comment_count,
        }
    }

    /// Due date in the past relative to `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due.map(|due| due < now).unwrap_or(false)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
