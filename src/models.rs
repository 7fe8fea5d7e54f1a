use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Bucket key for tasks that have no date.
pub const BACKLOG_KEY: &str = "backlog";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Task {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            completed: false,
            time: None,
        }
    }
}

/// Date-key (`YYYY-M-D` or `backlog`) to the ordered tasks of that bucket.
///
/// Serialized as a plain JSON object so the stored blob stays a
/// `{ "2024-5-10": [...], "backlog": [...] }` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyTasks {
    pub(crate) buckets: BTreeMap<String, Vec<Task>>,
}

impl DailyTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains_key(&self, date_key: &str) -> bool {
        self.buckets.contains_key(date_key)
    }

    /// Iterate buckets as `(date_key, tasks)` pairs
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[Task])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn task_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Empty when the lesson has no link
    #[serde(default)]
    pub url: String,
}

impl Lesson {
    pub fn new(id: String, name: String, url: Option<String>) -> Self {
        Self {
            id,
            name,
            url: url.unwrap_or_default(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        if self.url.trim().is_empty() {
            None
        } else {
            Some(self.url.as_str())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl LearningModule {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            lessons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_subject_icon")]
    pub icon: String,
    #[serde(default)]
    pub modules: Vec<LearningModule>,
}

fn default_subject_icon() -> String {
    crate::catalog::DEFAULT_SUBJECT_ICON.to_string()
}

impl Subject {
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

/// Ordered list of subjects, the root of the lesson catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub(crate) subjects: Vec<Subject>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subjects(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == subject_id)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// A mutation that could not be applied. State is left untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("No tasks scheduled under '{0}'")]
    DateKeyNotFound(String),
    #[error("Task {task_id} not found under '{date_key}'")]
    TaskNotFound { date_key: String, task_id: String },
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),
    #[error("Module {module_id} not found in subject {subject_id}")]
    ModuleNotFound { subject_id: String, module_id: String },
    #[error("Lesson {lesson_id} not found in module {module_id}")]
    LessonNotFound { module_id: String, lesson_id: String },
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Name cannot be empty")]
    EmptyName,
}

impl ModelError {
    /// True for stale-reference errors, which callers treat as "nothing to do"
    pub fn is_not_found(&self) -> bool {
        !matches!(self, ModelError::EmptyTitle | ModelError::EmptyName)
    }
}

/// Which of the two top-level screens is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Calendar,
    Lessons,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_tasks_serializes_as_plain_mapping() {
        let mut tasks = DailyTasks::new();
        tasks.buckets.insert(
            "2024-5-10".to_string(),
            vec![Task::new("t-1".to_string(), "Chuẩn bị slide".to_string())],
        );
        let json = serde_json::to_value(&tasks).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "2024-5-10": [{ "id": "t-1", "title": "Chuẩn bị slide", "completed": false }]
            })
        );
    }

    #[test]
    fn test_lesson_without_url_field_deserializes_empty() {
        let lesson: Lesson = serde_json::from_str(r#"{"id":"l1","name":"Bài 1"}"#).unwrap();
        assert_eq!(lesson.url, "");
        assert_eq!(lesson.url(), None);
    }

    #[test]
    fn test_catalog_reads_stored_subject_list() {
        let raw = r#"[{"id":"s1","name":"SNLT","icon":"fa-code","modules":[{"id":"m1","name":"Học phần cơ bản","lessons":[]}]}]"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.subject("s1").map(|s| s.modules.len()), Some(1));
    }
}
