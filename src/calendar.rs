//! Month navigation and the Sunday-first grid shown in the calendar tab.

use chrono::{Datelike, NaiveDate};

use crate::models::{DailyTasks, Task};
use crate::search::{SearchQuery, filter_tasks};
use crate::utils::date_key;

pub const MONTH_NAMES: [&str; 12] = [
    "Tháng 1", "Tháng 2", "Tháng 3", "Tháng 4", "Tháng 5", "Tháng 6", "Tháng 7", "Tháng 8",
    "Tháng 9", "Tháng 10", "Tháng 11", "Tháng 12",
];

/// Column headers, Sunday first
pub const WEEKDAY_HEADERS: [&str; 7] = ["CN", "T2", "T3", "T4", "T5", "T6", "T7"];

/// The month currently displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    pub year: i32,
    /// 1-based
    pub month: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month: month.clamp(1, 12),
        }
    }

    pub fn today(today: NaiveDate) -> Self {
        Self::new(today.year(), today.month())
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn days_in_month(self) -> u32 {
        let next = self.next();
        match (self.first_day(), next.first_day()) {
            (Some(first), Some(following)) => (following - first).num_days() as u32,
            _ => 0,
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// "Tháng 5 2024"
    pub fn title(self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

/// Cells of the month grid in reading order.
///
/// Leading `None` cells pad the first row so day 1 lands under its weekday
/// column; every day of the month follows. Trailing cells are not padded.
pub fn month_grid(cursor: MonthCursor) -> Vec<Option<NaiveDate>> {
    let Some(first) = cursor.first_day() else {
        return Vec::new();
    };
    let padding = first.weekday().num_days_from_sunday() as usize;

    let mut cells = vec![None; padding];
    cells.extend(
        first
            .iter_days()
            .take_while(|d| d.month() == cursor.month)
            .map(Some),
    );
    cells
}

/// What a single day cell shows
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary<'a> {
    pub date: NaiveDate,
    pub tasks: Vec<&'a Task>,
    pub has_incomplete: bool,
}

pub fn day_summary<'a>(tasks: &'a DailyTasks, date: NaiveDate, query: &SearchQuery) -> DaySummary<'a> {
    let tasks = filter_tasks(tasks.tasks_on(&date_key(date)), query);
    let has_incomplete = tasks.iter().any(|t| !t.completed);
    DaySummary {
        date,
        tasks,
        has_incomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    #[test]
    fn test_cursor_wraps_across_years() {
        let jan = MonthCursor::new(2024, 1);
        assert_eq!(jan.previous(), MonthCursor::new(2023, 12));
        assert_eq!(MonthCursor::new(2023, 12).next(), jan);
    }

    #[test]
    fn test_days_in_month_handles_leap_years() {
        assert_eq!(MonthCursor::new(2024, 2).days_in_month(), 29);
        assert_eq!(MonthCursor::new(2023, 2).days_in_month(), 28);
        assert_eq!(MonthCursor::new(2024, 12).days_in_month(), 31);
    }

    #[test]
    fn test_month_grid_pads_to_sunday_first_column() {
        // 1 May 2024 was a Wednesday
        let grid = month_grid(MonthCursor::new(2024, 5));
        assert_eq!(&grid[..3], &[None, None, None]);
        assert_eq!(grid[3], NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(grid.len(), 3 + 31);
        assert_eq!(grid.last().copied().flatten(), NaiveDate::from_ymd_opt(2024, 5, 31));
    }

    #[test]
    fn test_month_grid_without_padding_when_month_starts_sunday() {
        // 1 September 2024 was a Sunday
        let grid = month_grid(MonthCursor::new(2024, 9));
        assert_eq!(grid[0], NaiveDate::from_ymd_opt(2024, 9, 1));
        assert_eq!(grid.len(), 30);
    }

    #[test]
    fn test_title_uses_vietnamese_month_name() {
        assert_eq!(MonthCursor::new(2024, 10).title(), "Tháng 10 2024");
    }

    #[test]
    fn test_day_summary_flags_pending_work() {
        let mut tasks = DailyTasks::new();
        let mut ids = SequentialIds::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let done = tasks.add_task("2024-5-10", "Họp tổ", &mut ids).unwrap();
        tasks.toggle_task("2024-5-10", &done).unwrap();

        let summary = day_summary(&tasks, date, &SearchQuery::default());
        assert_eq!(summary.tasks.len(), 1);
        assert!(!summary.has_incomplete);

        tasks.add_task("2024-5-10", "Soạn giáo án", &mut ids).unwrap();
        let summary = day_summary(&tasks, date, &SearchQuery::new("soạn"));
        assert_eq!(summary.tasks.len(), 1);
        assert!(summary.has_incomplete);
    }
}
