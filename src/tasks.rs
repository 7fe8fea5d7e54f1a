//! Task model: per-day task buckets and the outstanding/overdue projection.

use chrono::NaiveDate;

use crate::ids::{EntityKind, IdGenerator};
use crate::models::{BACKLOG_KEY, DailyTasks, ModelError, Task};
use crate::search::SearchQuery;
use crate::utils::parse_date_key;

impl DailyTasks {
    /// Tasks stored under `date_key`, in insertion order
    pub fn tasks_on(&self, date_key: &str) -> &[Task] {
        self.buckets.get(date_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, date_key: &str, task_id: &str) -> Option<&Task> {
        self.tasks_on(date_key).iter().find(|t| t.id == task_id)
    }

    /// Append a new incomplete task to the bucket, creating the bucket if needed.
    /// Returns the new task's id.
    pub fn add_task(
        &mut self,
        date_key: &str,
        title: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, ModelError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ModelError::EmptyTitle);
        }

        let bucket = self.buckets.get(date_key);
        let id = ids.unique_id(EntityKind::Task, &|candidate: &str| {
            bucket.is_some_and(|tasks| tasks.iter().any(|t| t.id == candidate))
        });

        self.buckets
            .entry(date_key.to_string())
            .or_default()
            .push(Task::new(id.clone(), title.to_string()));
        Ok(id)
    }

    /// Flip `completed` on one task. Returns the new value.
    pub fn toggle_task(&mut self, date_key: &str, task_id: &str) -> Result<bool, ModelError> {
        let task = self
            .buckets
            .get_mut(date_key)
            .ok_or_else(|| ModelError::DateKeyNotFound(date_key.to_string()))?
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| task_not_found(date_key, task_id))?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    /// Remove one task. A bucket left empty is removed from the mapping.
    pub fn delete_task(&mut self, date_key: &str, task_id: &str) -> Result<Task, ModelError> {
        let bucket = self
            .buckets
            .get_mut(date_key)
            .ok_or_else(|| ModelError::DateKeyNotFound(date_key.to_string()))?;
        let index = bucket
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| task_not_found(date_key, task_id))?;

        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.buckets.remove(date_key);
        }
        Ok(removed)
    }

    /// Backlog tasks plus incomplete tasks dated strictly before `today`.
    ///
    /// Every backlog task is included regardless of completion; dated tasks only
    /// while incomplete. Overdue entries are ordered most recent date first,
    /// keeping stored order within a day. Keys that are not valid dates are
    /// never overdue.
    pub fn outstanding(&self, today: NaiveDate, query: &SearchQuery) -> Outstanding<'_> {
        let backlog = self
            .tasks_on(BACKLOG_KEY)
            .iter()
            .filter(|t| query.matches(&t.title))
            .map(|task| OutstandingTask {
                date_key: BACKLOG_KEY,
                date: None,
                task,
            })
            .collect();

        let mut overdue: Vec<OutstandingTask<'_>> = self
            .buckets
            .iter()
            .filter(|(key, _)| key.as_str() != BACKLOG_KEY)
            .filter_map(|(key, tasks)| {
                let date = parse_date_key(key)?;
                (date < today).then_some((key.as_str(), date, tasks))
            })
            .flat_map(|(date_key, date, tasks)| {
                tasks
                    .iter()
                    .filter(|t| !t.completed && query.matches(&t.title))
                    .map(move |task| OutstandingTask {
                        date_key,
                        date: Some(date),
                        task,
                    })
            })
            .collect();
        overdue.sort_by(|a, b| b.date.cmp(&a.date));

        Outstanding { backlog, overdue }
    }
}

fn task_not_found(date_key: &str, task_id: &str) -> ModelError {
    ModelError::TaskNotFound {
        date_key: date_key.to_string(),
        task_id: task_id.to_string(),
    }
}

/// One entry of the outstanding projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingTask<'a> {
    pub date_key: &'a str,
    /// `None` for backlog entries
    pub date: Option<NaiveDate>,
    pub task: &'a Task,
}

impl OutstandingTask<'_> {
    pub fn is_backlog(&self) -> bool {
        self.date.is_none()
    }

    /// Short label for lists: "Việc tồn" for backlog, `Hạn: D/M/YYYY` otherwise
    pub fn label(&self) -> String {
        match self.date {
            None => "Việc tồn".to_string(),
            Some(_) => {
                let parts: Vec<&str> = self.date_key.split('-').rev().collect();
                format!("Hạn: {}", parts.join("/"))
            }
        }
    }
}

/// Derived view of work that still needs attention. Recomputed on every read.
#[derive(Debug, Clone, Default)]
pub struct Outstanding<'a> {
    pub backlog: Vec<OutstandingTask<'a>>,
    pub overdue: Vec<OutstandingTask<'a>>,
}

impl<'a> Outstanding<'a> {
    /// Backlog first, then overdue
    pub fn iter(&self) -> impl Iterator<Item = &OutstandingTask<'a>> {
        self.backlog.iter().chain(self.overdue.iter())
    }

    pub fn len(&self) -> usize {
        self.backlog.len() + self.overdue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_task_appends_incomplete_task() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let id = tasks.add_task("2024-5-10", "Chuẩn bị slide", &mut ids).unwrap();

        let bucket = tasks.tasks_on("2024-5-10");
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id, id);
        assert_eq!(bucket[0].title, "Chuẩn bị slide");
        assert!(!bucket[0].completed);
    }

    #[test]
    fn test_add_task_preserves_order() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        for title in ["a", "b", "c"] {
            tasks.add_task("2024-5-10", title, &mut ids).unwrap();
        }
        let titles: Vec<&str> = tasks.tasks_on("2024-5-10").iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_task_rejects_blank_title() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        assert_eq!(tasks.add_task("backlog", "   ", &mut ids), Err(ModelError::EmptyTitle));
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_toggle_twice_round_trips() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let id = tasks.add_task("2024-5-10", "Chuẩn bị slide", &mut ids).unwrap();
        assert_eq!(tasks.toggle_task("2024-5-10", &id), Ok(true));
        assert_eq!(tasks.toggle_task("2024-5-10", &id), Ok(false));
        assert!(!tasks.tasks_on("2024-5-10")[0].completed);
    }

    #[test]
    fn test_toggle_missing_task_leaves_state_unchanged() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        tasks.add_task("2024-5-10", "x", &mut ids).unwrap();
        let before = tasks.clone();
        assert!(tasks.toggle_task("2024-5-10", "nope").is_err());
        assert!(tasks.toggle_task("2024-5-11", "nope").is_err());
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_delete_last_task_prunes_bucket() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let a = tasks.add_task(BACKLOG_KEY, "a", &mut ids).unwrap();
        let b = tasks.add_task(BACKLOG_KEY, "b", &mut ids).unwrap();

        tasks.delete_task(BACKLOG_KEY, &a).unwrap();
        assert_eq!(tasks.tasks_on(BACKLOG_KEY).len(), 1);

        tasks.delete_task(BACKLOG_KEY, &b).unwrap();
        assert!(!tasks.contains_key(BACKLOG_KEY));
    }

    #[test]
    fn test_delete_missing_task_is_idempotent() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let id = tasks.add_task("2024-5-10", "x", &mut ids).unwrap();
        tasks.delete_task("2024-5-10", &id).unwrap();
        let before = tasks.clone();
        assert_eq!(
            tasks.delete_task("2024-5-10", &id),
            Err(ModelError::DateKeyNotFound("2024-5-10".to_string()))
        );
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_outstanding_keeps_only_incomplete_overdue() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let open = tasks.add_task("2024-5-9", "open", &mut ids).unwrap();
        let done = tasks.add_task("2024-5-9", "done", &mut ids).unwrap();
        tasks.toggle_task("2024-5-9", &done).unwrap();
        tasks.add_task("2024-5-10", "today", &mut ids).unwrap();

        let outstanding = tasks.outstanding(day(2024, 5, 10), &SearchQuery::default());
        let ids: Vec<&str> = outstanding.iter().map(|o| o.task.id.as_str()).collect();
        assert_eq!(ids, vec![open.as_str()]);
    }

    #[test]
    fn test_outstanding_orders_backlog_then_recent_first() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        tasks.add_task("2024-4-30", "older", &mut ids).unwrap();
        tasks.add_task("2024-5-9", "yesterday", &mut ids).unwrap();
        tasks.add_task("2024-5-1", "early may", &mut ids).unwrap();
        let scratch = tasks.add_task(BACKLOG_KEY, "scratch", &mut ids).unwrap();
        tasks.toggle_task(BACKLOG_KEY, &scratch).unwrap();

        let outstanding = tasks.outstanding(day(2024, 5, 10), &SearchQuery::default());
        let titles: Vec<&str> = outstanding.iter().map(|o| o.task.title.as_str()).collect();
        assert_eq!(titles, vec!["scratch", "yesterday", "early may", "older"]);
        assert!(outstanding.backlog[0].is_backlog());
    }

    #[test]
    fn test_outstanding_filters_by_query_and_skips_bad_keys() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        tasks.add_task("2024-5-1", "Chấm bài", &mut ids).unwrap();
        tasks.add_task("2024-5-2", "Họp tổ", &mut ids).unwrap();
        tasks.add_task("not-a-date", "Chấm bài lạc", &mut ids).unwrap();
        tasks.add_task(BACKLOG_KEY, "chấm thêm", &mut ids).unwrap();

        let outstanding = tasks.outstanding(day(2024, 5, 10), &SearchQuery::new("CHẤM"));
        assert_eq!(outstanding.backlog.len(), 1);
        assert_eq!(outstanding.overdue.len(), 1);
        assert_eq!(outstanding.overdue[0].task.title, "Chấm bài");
    }

    #[test]
    fn test_outstanding_label_formats_day_first() {
        let task = Task::new("t-1".to_string(), "x".to_string());
        let entry = OutstandingTask {
            date_key: "2024-5-9",
            date: Some(day(2024, 5, 9)),
            task: &task,
        };
        assert_eq!(entry.label(), "Hạn: 9/5/2024");
    }
}
