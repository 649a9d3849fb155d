use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;

pub type TaskId = Uuid;
pub type UserId = Uuid;

/// Kanban column a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// Columns in board order.
    pub const ALL: [TaskStatus; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "to do" | "todo" => Ok(Self::ToDo),
            "in progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// Task priority level.
///
/// Older clients stored the level with a decorative glyph appended
/// (`"High🔥"`); those labels are still accepted on input but the stored and
/// serialized value is always the plain level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    #[serde(alias = "Low💤", alias = "low")]
    Low,
    #[serde(alias = "Medium⌛", alias = "medium")]
    Medium,
    #[serde(alias = "High🔥", alias = "high")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Sort key for "most urgent first" ordering.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s
            .trim()
            .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_lowercase();
        match level.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseError::InvalidPriority(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Snapshot of every user-editable field, suitable for a full-record update.
    pub fn record_patch(&self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title.clone()),
            description: self.description.clone(),
            due_date: self.due_date,
            status: Some(self.status),
            priority: Some(self.priority),
            position: Some(self.position),
        }
    }
}

/// Fields accepted when creating a task. Position is always assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "due_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "due_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.position.is_none()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
    }
}

/// `YYYY-MM-DD` on output; accepts a plain date or an RFC 3339 timestamp on input.
mod due_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_some(&date.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        let Some(raw) = raw.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        if let Ok(date) = NaiveDate::parse_from_str(&raw, FORMAT) {
            return Ok(Some(date));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.date_naive()))
            .map_err(|_| D::Error::custom(format!("invalid due date: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            title: "Write release notes".into(),
            description: Some("for 0.2".into()),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            status: TaskStatus::InProgress,
            priority: Priority::High,
            position: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_serde_uses_column_labels() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"To Do\"").unwrap(),
            TaskStatus::ToDo
        );
        assert!(serde_json::from_str::<TaskStatus>("\"in_progress\"").is_err());
    }

    #[test]
    fn test_status_from_str_is_lenient() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::ToDo);
        assert_eq!("To Do".parse::<TaskStatus>().unwrap(), TaskStatus::ToDo);
        assert_eq!(
            "in-progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!(matches!(
            "later".parse::<TaskStatus>(),
            Err(ParseError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_priority_accepts_legacy_glyph_labels() {
        assert_eq!(
            serde_json::from_str::<Priority>("\"High🔥\"").unwrap(),
            Priority::High
        );
        assert_eq!(
            serde_json::from_str::<Priority>("\"Low💤\"").unwrap(),
            Priority::Low
        );
        assert_eq!("Medium⌛".parse::<Priority>().unwrap(), Priority::Medium);
        // Stored/serialized value never carries the glyph
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"High\"");
    }

    #[test]
    fn test_priority_rank_orders_most_urgent_first() {
        let mut levels = vec![Priority::Low, Priority::High, Priority::Medium];
        levels.sort_by_key(Priority::rank);
        assert_eq!(levels, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_task_json_shape() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "In Progress");
        assert_eq!(json["priority"], "High");
        assert_eq!(json["due_date"], "2025-03-14");
        assert_eq!(json["position"], 2);

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_due_date_accepts_timestamps() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"due_date": "2024-06-01T00:00:00.000Z"}"#).unwrap();
        assert_eq!(patch.due_date, NaiveDate::from_ymd_opt(2024, 6, 1));

        let patch: TaskPatch = serde_json::from_str(r#"{"due_date": ""}"#).unwrap();
        assert_eq!(patch.due_date, None);

        assert!(serde_json::from_str::<TaskPatch>(r#"{"due_date": "soon"}"#).is_err());
    }

    #[test]
    fn test_missing_position_defaults_to_zero() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "owner": Uuid::new_v4(),
            "title": "legacy",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.position, 0);
        assert_eq!(task.status, TaskStatus::ToDo);
        assert_eq!(task.priority, Priority::Low);
    }

    #[test]
    fn test_record_patch_round_trips_through_apply() {
        let task = sample_task();
        let mut other = sample_task();
        other.title = "something else".into();
        other.position = 9;
        task.record_patch().apply_to(&mut other);
        assert_eq!(other.title, task.title);
        assert_eq!(other.position, task.position);
        assert_eq!(other.status, task.status);
    }

    #[test]
    fn test_empty_patch_serializes_to_empty_object() {
        let patch = TaskPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "{}");
    }
}
