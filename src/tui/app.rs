use crate::calendar::{MonthCursor, day_summary};
use crate::catalog::ImportedSubject;
use crate::models::{BACKLOG_KEY, LearningModule, Lesson, Task, View};
use crate::outline::{OutlineError, OutlineService};
use crate::planner::{Planner, PlannerError};
use crate::selection::{DeleteConfirmation, DeleteRequest};
use crate::store::KeyValueStore;
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::utils::{date_key, format_key_binding_for_display, parse_key_binding};
use crate::Config;
use chrono::{Days, NaiveDate};
use std::cmp;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

/// Run worker code so that a panic still yields a result for the UI thread
fn run_job<T>(job: impl FnOnce() -> Result<T, OutlineError>) -> Result<T, OutlineError> {
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|_| {
        tracing::error!("worker job panicked");
        Err(OutlineError::Interrupted)
    })
}

/// Planner as the terminal session holds it; the backing store is chosen at startup
pub type SessionPlanner = Planner<Box<dyn KeyValueStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Search,
    Help,
    Input,
    Import,
    Outline,
}

/// Pane that receives list navigation and item actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Grid,
    DayTasks,
    Outstanding,
    Subjects,
    Catalog,
}

impl Focus {
    pub fn home(view: View) -> Self {
        match view {
            View::Calendar => Focus::Grid,
            View::Lessons => Focus::Subjects,
        }
    }

    fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::DayTasks,
            Focus::DayTasks => Focus::Outstanding,
            Focus::Outstanding => Focus::Grid,
            Focus::Subjects => Focus::Catalog,
            Focus::Catalog => Focus::Subjects,
        }
    }
}

/// What the input popup creates or edits when submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    AddTask { date_key: String },
    AddSubject,
    RenameSubject { subject_id: String },
    AddModule { subject_id: String },
    RenameModule { subject_id: String, module_id: String },
    AddLesson { subject_id: String, module_id: String },
    EditLesson { subject_id: String, module_id: String, lesson_id: String },
}

#[derive(Debug, Clone)]
pub struct InputForm {
    pub kind: InputKind,
    pub title: String,
    pub labels: Vec<&'static str>,
    pub fields: Vec<Editor>,
    pub current_field: usize,
}

impl InputForm {
    fn new(kind: InputKind, title: String, fields: Vec<(&'static str, &str)>) -> Self {
        let (labels, fields): (Vec<&'static str>, Vec<Editor>) = fields
            .into_iter()
            .map(|(label, value)| (label, Editor::from_string(value)))
            .unzip();
        Self {
            kind,
            title,
            labels,
            fields,
            current_field: 0,
        }
    }

    pub fn current_editor_mut(&mut self) -> Option<&mut Editor> {
        self.fields.get_mut(self.current_field)
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.current_field = (self.current_field + 1) % self.fields.len();
        }
    }

    pub fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.current_field = (self.current_field + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn value(&self, index: usize) -> String {
        self.fields.get(index).map(Editor::text).unwrap_or_default()
    }
}

/// Item a delete request points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Task { date_key: String, task_id: String },
    Subject { subject_id: String },
    Module { subject_id: String, module_id: String },
    Lesson { subject_id: String, module_id: String, lesson_id: String },
}

impl DeleteTarget {
    pub fn label(&self) -> &'static str {
        match self {
            DeleteTarget::Task { .. } => "công việc",
            DeleteTarget::Subject { .. } => "môn học",
            DeleteTarget::Module { .. } => "học phần",
            DeleteTarget::Lesson { .. } => "bài học",
        }
    }
}

/// One line of the flattened module/lesson tree of the selected subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRow {
    Module { module_id: String },
    Lesson { module_id: String, lesson_id: String },
}

impl CatalogRow {
    pub fn module_id(&self) -> &str {
        match self {
            CatalogRow::Module { module_id } | CatalogRow::Lesson { module_id, .. } => module_id,
        }
    }
}

/// Results coming back from worker threads
#[derive(Debug)]
pub enum JobResult {
    Import(Result<Vec<ImportedSubject>, OutlineError>),
    Outline {
        lesson_id: String,
        result: Result<String, OutlineError>,
    },
}

#[derive(Debug, Clone)]
pub struct OutlineState {
    pub title: String,
    pub lesson_id: String,
    /// `None` while the draft is being generated
    pub content: Option<String>,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    pub focus: Focus,
    pub month: MonthCursor,
    /// Day under the grid cursor; follows the arrow keys
    pub cursor: NaiveDate,
    pub day_index: usize,
    pub outstanding_index: usize,
    pub catalog_index: usize,
}

impl UiState {
    fn new(today: NaiveDate, focus: Focus) -> Self {
        Self {
            mode: Mode::View,
            focus,
            month: MonthCursor::today(today),
            cursor: today,
            day_index: 0,
            outstanding_index: 0,
            catalog_index: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App {
    pub config: Config,
    pub planner: SessionPlanner,
    pub today: NaiveDate,

    pub ui: UiState,
    pub status: StatusState,
    pub input: Option<InputForm>,
    pub search_editor: Editor,
    pub import_editor: Editor,
    pub outline: Option<OutlineState>,
    pub delete_confirm: DeleteConfirmation<DeleteTarget>,

    service: Arc<dyn OutlineService>,
    jobs_tx: Sender<JobResult>,
    jobs_rx: Receiver<JobResult>,
}

impl App {
    pub fn new(
        config: Config,
        planner: SessionPlanner,
        service: Arc<dyn OutlineService>,
    ) -> Result<Self, TuiError> {
        validate_key_bindings(&config)?;
        let today = crate::utils::today();
        let focus = Focus::home(planner.view());
        let (jobs_tx, jobs_rx) = mpsc::channel();

        Ok(Self {
            config,
            planner,
            today,
            ui: UiState::new(today, focus),
            status: StatusState::default(),
            input: None,
            search_editor: Editor::new(),
            import_editor: Editor::multi_line(),
            outline: None,
            delete_confirm: DeleteConfirmation::new(),
            service,
            jobs_tx,
            jobs_rx,
        })
    }

    // ---- status line ----

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status.message = Some(message.into());
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds).
    /// Expired delete arms are dropped on the same tick.
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
        self.delete_confirm.expire(Instant::now());
    }

    fn report_error(&mut self, error: PlannerError) {
        tracing::warn!(error = %error, "action failed");
        self.set_status_message(format!("Lỗi: {}", error));
    }

    // ---- views and focus ----

    pub fn switch_view(&mut self, view: View) {
        self.planner.select_view(view);
        self.ui.focus = Focus::home(view);
        self.delete_confirm.cancel();
    }

    pub fn cycle_focus(&mut self) {
        self.ui.focus = self.ui.focus.next();
        self.delete_confirm.cancel();
    }

    pub fn cycle_theme(&mut self) {
        let next = self.config.next_theme_name();
        match self.config.set_theme(&next) {
            Ok(()) => self.set_status_message(format!("Giao diện: {}", next)),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // ---- calendar ----

    /// Move the grid cursor by whole days, following it across months
    pub fn move_cursor(&mut self, days: i64) {
        let moved = if days >= 0 {
            self.ui.cursor.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.ui.cursor.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        if let Some(date) = moved {
            self.ui.cursor = date;
            self.ui.month = MonthCursor::today(date);
            self.select_date(date);
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.planner.select_date(Some(date));
        self.ui.day_index = 0;
    }

    /// Step one month back or forward. The date selection is cleared.
    pub fn change_month(&mut self, forward: bool) {
        self.ui.month = if forward {
            self.ui.month.next()
        } else {
            self.ui.month.previous()
        };
        if let Some(first) = self.ui.month.first_day() {
            self.ui.cursor = first;
        }
        self.planner.select_date(None);
        self.ui.day_index = 0;
    }

    pub fn go_to_today(&mut self) {
        self.ui.month = MonthCursor::today(self.today);
        self.ui.cursor = self.today;
        self.select_date(self.today);
    }

    pub fn selected_date_key(&self) -> Option<String> {
        self.planner.selected_date().map(date_key)
    }

    /// Tasks of the selected day that pass the search filter
    pub fn day_tasks(&self) -> Vec<&Task> {
        match self.planner.selected_date() {
            Some(date) => day_summary(self.planner.tasks(), date, self.planner.search()).tasks,
            None => Vec::new(),
        }
    }

    fn selected_day_task(&self) -> Option<(String, String)> {
        let key = self.selected_date_key()?;
        let tasks = self.day_tasks();
        let task = tasks.get(self.ui.day_index)?;
        Some((key, task.id.clone()))
    }

    fn selected_outstanding(&self) -> Option<(String, String)> {
        let outstanding = self.planner.outstanding(self.today);
        let entry = outstanding.iter().nth(self.ui.outstanding_index)?;
        Some((entry.date_key.to_string(), entry.task.id.clone()))
    }

    fn focused_task(&self) -> Option<(String, String)> {
        match self.ui.focus {
            Focus::DayTasks => self.selected_day_task(),
            Focus::Outstanding => self.selected_outstanding(),
            _ => None,
        }
    }

    pub fn toggle_selected_task(&mut self) {
        let Some((key, task_id)) = self.focused_task() else {
            return;
        };
        match self.planner.toggle_task(&key, &task_id) {
            Ok(Some(true)) => self.set_status_message("Đã hoàn thành"),
            Ok(Some(false)) => self.set_status_message("Đánh dấu chưa xong"),
            Ok(None) => {}
            Err(e) => self.report_error(e),
        }
        self.clamp_selection();
    }

    /// Jump the calendar to the due date of the focused outstanding task
    pub fn open_outstanding_date(&mut self) {
        let Some((key, _)) = self.selected_outstanding() else {
            return;
        };
        let Some(date) = crate::utils::parse_date_key(&key) else {
            self.set_status_message("Việc tồn đọng không có ngày");
            return;
        };
        self.ui.cursor = date;
        self.ui.month = MonthCursor::today(date);
        self.select_date(date);
        self.ui.focus = Focus::DayTasks;
    }

    // ---- lessons ----

    /// Module and lesson rows of the selected subject under the current search
    pub fn catalog_rows(&self) -> Vec<CatalogRow> {
        let Some(view) = self.planner.current_subject() else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        for module in &view.modules {
            rows.push(CatalogRow::Module {
                module_id: module.module.id.clone(),
            });
            rows.extend(module.lessons.iter().map(|lesson| CatalogRow::Lesson {
                module_id: module.module.id.clone(),
                lesson_id: lesson.id.clone(),
            }));
        }
        rows
    }

    pub fn selected_catalog_row(&self) -> Option<CatalogRow> {
        self.catalog_rows().into_iter().nth(self.ui.catalog_index)
    }

    /// Position of the selected subject among the visible ones
    pub fn subject_index(&self) -> Option<usize> {
        let selected = self.planner.selected_subject_id()?;
        self.planner
            .visible_subjects()
            .iter()
            .position(|v| v.id() == selected)
    }

    fn move_subject(&mut self, down: bool) {
        let visible: Vec<String> = self
            .planner
            .visible_subjects()
            .iter()
            .map(|v| v.id().to_string())
            .collect();
        let mut index = self.subject_index().unwrap_or(0);
        step(&mut index, visible.len(), down);
        if let Some(id) = visible.get(index) {
            self.planner.select_subject(id);
            self.ui.catalog_index = 0;
        }
    }

    fn module(&self, subject_id: &str, module_id: &str) -> Option<&LearningModule> {
        self.planner
            .catalog()
            .subject(subject_id)?
            .modules
            .iter()
            .find(|m| m.id == module_id)
    }

    fn lesson(&self, subject_id: &str, module_id: &str, lesson_id: &str) -> Option<&Lesson> {
        self.module(subject_id, module_id)?
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
    }

    /// Copy the link of the selected lesson to the system clipboard
    pub fn copy_selected_link(&mut self) {
        let Some(subject_id) = self.planner.selected_subject_id().map(str::to_string) else {
            return;
        };
        let Some(CatalogRow::Lesson { module_id, lesson_id }) = self.selected_catalog_row() else {
            return;
        };
        let url = self
            .lesson(&subject_id, &module_id, &lesson_id)
            .and_then(Lesson::url)
            .map(str::to_string);
        match url {
            Some(url) => self.copy_to_clipboard(url, "Đã sao chép link bài giảng"),
            None => self.set_status_message("Chưa gắn link giáo án"),
        }
    }

    fn copy_to_clipboard(&mut self, text: String, done: &str) {
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.set_status_message(done),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed");
                self.set_status_message(format!("Không thể sao chép: {}", e));
            }
        }
    }

    // ---- list navigation ----

    pub fn move_selection(&mut self, down: bool) {
        match self.ui.focus {
            Focus::Grid => self.move_cursor(if down { 7 } else { -7 }),
            Focus::DayTasks => {
                let len = self.day_tasks().len();
                step(&mut self.ui.day_index, len, down);
            }
            Focus::Outstanding => {
                let len = self.planner.outstanding(self.today).len();
                step(&mut self.ui.outstanding_index, len, down);
            }
            Focus::Subjects => self.move_subject(down),
            Focus::Catalog => {
                let len = self.catalog_rows().len();
                step(&mut self.ui.catalog_index, len, down);
            }
        }
    }

    /// Pull list indices back inside their lists after items disappeared
    pub fn clamp_selection(&mut self) {
        let day_len = self.day_tasks().len();
        let outstanding_len = self.planner.outstanding(self.today).len();
        let catalog_len = self.catalog_rows().len();
        self.ui.day_index = cmp::min(self.ui.day_index, day_len.saturating_sub(1));
        self.ui.outstanding_index = cmp::min(self.ui.outstanding_index, outstanding_len.saturating_sub(1));
        self.ui.catalog_index = cmp::min(self.ui.catalog_index, catalog_len.saturating_sub(1));
    }

    // ---- search ----

    pub fn enter_search_mode(&mut self) {
        self.search_editor = Editor::from_string(self.planner.search_text());
        self.ui.mode = Mode::Search;
    }

    /// Re-run the filter after every keystroke
    pub fn update_search(&mut self) {
        let text = self.search_editor.text();
        self.planner.set_search_query(&text);
        self.clamp_selection();
    }

    pub fn exit_search_mode(&mut self, keep_query: bool) {
        if !keep_query {
            self.search_editor = Editor::new();
            self.planner.set_search_query("");
        }
        self.ui.mode = Mode::View;
        self.clamp_selection();
    }

    // ---- input popup ----

    pub fn open_input(&mut self, kind: InputKind) {
        let form = self.build_form(kind);
        self.input = Some(form);
        self.ui.mode = Mode::Input;
        self.delete_confirm.cancel();
    }

    fn build_form(&self, kind: InputKind) -> InputForm {
        match &kind {
            InputKind::AddTask { date_key } => {
                let title = if date_key == BACKLOG_KEY {
                    "Thêm việc tồn đọng".to_string()
                } else {
                    let day: Vec<&str> = date_key.split('-').rev().collect();
                    format!("Thêm việc ngày {}", day.join("/"))
                };
                InputForm::new(kind, title, vec![("Tiêu đề", "")])
            }
            InputKind::AddSubject => {
                InputForm::new(kind, "Thêm môn học".to_string(), vec![("Tên môn", "")])
            }
            InputKind::RenameSubject { subject_id } => {
                let name = self
                    .planner
                    .catalog()
                    .subject(subject_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                InputForm::new(kind, "Đổi tên môn".to_string(), vec![("Tên môn", name.as_str())])
            }
            InputKind::AddModule { .. } => {
                InputForm::new(kind, "Thêm học phần".to_string(), vec![("Tên học phần", "")])
            }
            InputKind::RenameModule { subject_id, module_id } => {
                let name = self
                    .module(subject_id, module_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                InputForm::new(kind, "Đổi tên học phần".to_string(), vec![("Tên học phần", name.as_str())])
            }
            InputKind::AddLesson { .. } => InputForm::new(
                kind,
                "Thêm bài học".to_string(),
                vec![("Tên bài học", ""), ("Link bài giảng", "")],
            ),
            InputKind::EditLesson { subject_id, module_id, lesson_id } => {
                let (name, url) = self
                    .lesson(subject_id, module_id, lesson_id)
                    .map(|l| (l.name.clone(), l.url.clone()))
                    .unwrap_or_default();
                InputForm::new(
                    kind,
                    "Sửa bài học".to_string(),
                    vec![("Tên bài học", name.as_str()), ("Link bài giảng", url.as_str())],
                )
            }
        }
    }

    pub fn cancel_input(&mut self) {
        self.input = None;
        self.ui.mode = Mode::View;
    }

    /// Apply the popup. Validation errors keep it open so the text can be fixed.
    pub fn submit_input(&mut self) {
        let Some(form) = self.input.take() else {
            return;
        };
        let first = form.value(0);
        let second = form.value(1);
        let url = Some(second.as_str()).filter(|u| !u.trim().is_empty());

        let (result, done) = match &form.kind {
            InputKind::AddTask { date_key } => (
                self.planner.add_task(date_key, &first).map(|r| r.is_some()),
                "Đã thêm công việc",
            ),
            InputKind::AddSubject => {
                let result = self.planner.add_subject(&first);
                if let Ok(Some(id)) = &result {
                    self.planner.select_subject(id);
                    self.ui.catalog_index = 0;
                }
                (result.map(|r| r.is_some()), "Đã thêm môn học")
            }
            InputKind::RenameSubject { subject_id } => (
                self.planner.rename_subject(subject_id, &first).map(|r| r.is_some()),
                "Đã đổi tên môn",
            ),
            InputKind::AddModule { subject_id } => (
                self.planner.add_module(subject_id, &first).map(|r| r.is_some()),
                "Đã thêm học phần",
            ),
            InputKind::RenameModule { subject_id, module_id } => (
                self.planner
                    .rename_module(subject_id, module_id, &first)
                    .map(|r| r.is_some()),
                "Đã đổi tên học phần",
            ),
            InputKind::AddLesson { subject_id, module_id } => (
                self.planner
                    .add_lesson(subject_id, module_id, &first, url)
                    .map(|r| r.is_some()),
                "Đã thêm bài học",
            ),
            InputKind::EditLesson { subject_id, module_id, lesson_id } => (
                self.planner
                    .update_lesson(subject_id, module_id, lesson_id, &first, url)
                    .map(|r| r.is_some()),
                "Đã lưu bài học",
            ),
        };

        match result {
            Ok(applied) => {
                self.ui.mode = Mode::View;
                if applied {
                    self.set_status_message(done);
                } else {
                    self.set_status_message("Mục này không còn tồn tại");
                }
            }
            Err(PlannerError::Model(e)) => {
                self.set_status_message(e.to_string());
                self.input = Some(form);
            }
            Err(e) => {
                self.ui.mode = Mode::View;
                self.report_error(e);
            }
        }
        self.clamp_selection();
    }

    /// `new` key: add whatever the focused pane lists
    pub fn start_add(&mut self) {
        match self.ui.focus {
            Focus::Grid | Focus::DayTasks => {
                let date = self.planner.selected_date().unwrap_or(self.ui.cursor);
                self.planner.select_date(Some(date));
                self.open_input(InputKind::AddTask { date_key: date_key(date) });
            }
            Focus::Outstanding => self.start_add_backlog(),
            Focus::Subjects => self.open_input(InputKind::AddSubject),
            Focus::Catalog => {
                let Some(subject_id) = self.planner.selected_subject_id().map(str::to_string) else {
                    return;
                };
                match self.selected_catalog_row() {
                    Some(row) => self.open_input(InputKind::AddLesson {
                        subject_id,
                        module_id: row.module_id().to_string(),
                    }),
                    None => self.set_status_message("Chưa có học phần, hãy thêm học phần trước"),
                }
            }
        }
    }

    pub fn start_add_backlog(&mut self) {
        self.open_input(InputKind::AddTask {
            date_key: BACKLOG_KEY.to_string(),
        });
    }

    pub fn start_add_module(&mut self) {
        match self.planner.selected_subject_id().map(str::to_string) {
            Some(subject_id) => self.open_input(InputKind::AddModule { subject_id }),
            None => self.set_status_message("Vui lòng chọn hoặc tạo môn học mới"),
        }
    }

    pub fn start_edit(&mut self) {
        let Some(subject_id) = self.planner.selected_subject_id().map(str::to_string) else {
            return;
        };
        match self.ui.focus {
            Focus::Subjects => self.open_input(InputKind::RenameSubject { subject_id }),
            Focus::Catalog => match self.selected_catalog_row() {
                Some(CatalogRow::Module { module_id }) => {
                    self.open_input(InputKind::RenameModule { subject_id, module_id })
                }
                Some(CatalogRow::Lesson { module_id, lesson_id }) => self.open_input(InputKind::EditLesson {
                    subject_id,
                    module_id,
                    lesson_id,
                }),
                None => {}
            },
            _ => {}
        }
    }

    // ---- deletes ----

    fn delete_target(&self) -> Option<DeleteTarget> {
        match self.ui.focus {
            Focus::Grid => None,
            Focus::DayTasks | Focus::Outstanding => {
                let (date_key, task_id) = self.focused_task()?;
                Some(DeleteTarget::Task { date_key, task_id })
            }
            Focus::Subjects => Some(DeleteTarget::Subject {
                subject_id: self.planner.selected_subject_id()?.to_string(),
            }),
            Focus::Catalog => {
                let subject_id = self.planner.selected_subject_id()?.to_string();
                Some(match self.selected_catalog_row()? {
                    CatalogRow::Module { module_id } => DeleteTarget::Module { subject_id, module_id },
                    CatalogRow::Lesson { module_id, lesson_id } => DeleteTarget::Lesson {
                        subject_id,
                        module_id,
                        lesson_id,
                    },
                })
            }
        }
    }

    /// First press arms the focused item, a second press within the window deletes it
    pub fn request_delete(&mut self, now: Instant) {
        let Some(target) = self.delete_target() else {
            return;
        };
        match self.delete_confirm.request(target.clone(), now) {
            DeleteRequest::Armed => {
                let key = format_key_binding_for_display(&self.config.key_bindings.delete);
                self.set_status_message(format!("Xác nhận? Nhấn {} lần nữa để xóa {}", key, target.label()));
            }
            DeleteRequest::Confirmed => self.perform_delete(target),
        }
    }

    pub fn is_armed(&self, target: &DeleteTarget) -> bool {
        self.delete_confirm.is_armed(target, Instant::now())
    }

    fn perform_delete(&mut self, target: DeleteTarget) {
        let result = match &target {
            DeleteTarget::Task { date_key, task_id } => {
                self.planner.delete_task(date_key, task_id).map(|r| r.is_some())
            }
            DeleteTarget::Subject { subject_id } => {
                self.planner.delete_subject(subject_id).map(|r| r.is_some())
            }
            DeleteTarget::Module { subject_id, module_id } => {
                self.planner.delete_module(subject_id, module_id).map(|r| r.is_some())
            }
            DeleteTarget::Lesson { subject_id, module_id, lesson_id } => self
                .planner
                .delete_lesson(subject_id, module_id, lesson_id)
                .map(|r| r.is_some()),
        };
        match result {
            Ok(true) => self.set_status_message(format!("Đã xóa {}", target.label())),
            Ok(false) => {}
            Err(e) => self.report_error(e),
        }
        self.clamp_selection();
    }

    // ---- AI import ----

    pub fn open_import(&mut self) {
        self.switch_view(View::Lessons);
        self.ui.mode = Mode::Import;
    }

    pub fn close_import(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn paste_into_import(&mut self) {
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
            Ok(text) => self.import_editor.insert_str(&text),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard read failed");
                self.set_status_message(format!("Không đọc được clipboard: {}", e));
            }
        }
    }

    /// Hand the pasted text to the outline service on a worker thread.
    /// Blank text is ignored; a running import blocks a second one.
    pub fn submit_import(&mut self) {
        let text = self.import_editor.text();
        if text.trim().is_empty() {
            return;
        }
        if let Err(e) = self.planner.begin_import() {
            self.report_error(e);
            return;
        }
        tracing::info!(chars = text.chars().count(), "import started");

        let service = Arc::clone(&self.service);
        let tx = self.jobs_tx.clone();
        thread::spawn(move || {
            let result = run_job(|| service.parse_sheet(&text));
            let _ = tx.send(JobResult::Import(result));
        });
    }

    fn apply_import(&mut self, result: Result<Vec<ImportedSubject>, OutlineError>) {
        match self.planner.finish_import(result) {
            Ok(ids) => {
                self.import_editor = Editor::multi_line();
                if self.ui.mode == Mode::Import {
                    self.ui.mode = Mode::View;
                }
                self.set_status_message(format!("Đã nhập {} môn học", ids.len()));
            }
            Err(e) => self.report_error(e),
        }
        self.clamp_selection();
    }

    // ---- lesson outline ----

    pub fn request_outline(&mut self) {
        let Some(subject_id) = self.planner.selected_subject_id().map(str::to_string) else {
            return;
        };
        let Some(CatalogRow::Lesson { module_id, lesson_id }) = self.selected_catalog_row() else {
            self.set_status_message("Chọn một bài học để soạn dàn ý");
            return;
        };
        let subject_name = self
            .planner
            .catalog()
            .subject(&subject_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let Some(topic) = self
            .lesson(&subject_id, &module_id, &lesson_id)
            .map(|l| l.name.clone())
        else {
            return;
        };

        self.outline = Some(OutlineState {
            title: topic.clone(),
            lesson_id: lesson_id.clone(),
            content: None,
            scroll: 0,
        });
        self.ui.mode = Mode::Outline;

        let service = Arc::clone(&self.service);
        let tx = self.jobs_tx.clone();
        thread::spawn(move || {
            let result = run_job(|| service.lesson_outline(&subject_name, &topic));
            let _ = tx.send(JobResult::Outline { lesson_id, result });
        });
    }

    fn apply_outline(&mut self, lesson_id: String, result: Result<String, OutlineError>) {
        // the popup may have been closed or reopened for another lesson meanwhile
        let Some(outline) = self.outline.as_mut().filter(|o| o.lesson_id == lesson_id) else {
            return;
        };
        outline.content = Some(match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "outline generation failed");
                format!("**Không tạo được dàn ý:** {}", e)
            }
        });
    }

    pub fn close_outline(&mut self) {
        self.outline = None;
        self.ui.mode = Mode::View;
    }

    pub fn copy_outline(&mut self) {
        let Some(content) = self.outline.as_ref().and_then(|o| o.content.clone()) else {
            return;
        };
        self.copy_to_clipboard(content, "Đã sao chép dàn ý");
    }

    pub fn scroll_outline(&mut self, down: bool) {
        if let Some(outline) = self.outline.as_mut() {
            outline.scroll = if down {
                outline.scroll.saturating_add(1)
            } else {
                outline.scroll.saturating_sub(1)
            };
        }
    }

    /// Drain finished worker results; called once per frame
    pub fn poll_jobs(&mut self) {
        while let Ok(job) = self.jobs_rx.try_recv() {
            match job {
                JobResult::Import(result) => self.apply_import(result),
                JobResult::Outline { lesson_id, result } => self.apply_outline(lesson_id, result),
            }
        }
    }

    // ---- status bar hints ----

    pub fn key_hints(&self) -> Vec<String> {
        let kb = &self.config.key_bindings;
        let key = format_key_binding_for_display;
        match self.ui.mode {
            Mode::Search => vec!["Enter: Giữ bộ lọc".to_string(), "Esc: Xóa tìm kiếm".to_string()],
            Mode::Help => vec!["Esc: Đóng".to_string()],
            Mode::Input => vec![
                "Enter: Lưu".to_string(),
                "Tab: Trường tiếp".to_string(),
                "Esc: Hủy".to_string(),
            ],
            Mode::Import => vec![
                format!("{}: Xác nhận nhập", key(&kb.submit)),
                format!("{}: Dán", key(&kb.paste)),
                "Esc: Đóng".to_string(),
            ],
            Mode::Outline => vec![
                format!("{}/{}: Cuộn", key(&kb.list_up), key(&kb.list_down)),
                format!("{}: Sao chép", key(&kb.select)),
                "Esc: Đóng".to_string(),
            ],
            Mode::View => {
                let mut hints = match self.ui.focus {
                    Focus::Grid => vec![
                        "←↑↓→: Chọn ngày".to_string(),
                        format!("{}/{}: Tháng", key(&kb.prev_month), key(&kb.next_month)),
                        format!("{}: Hôm nay", key(&kb.today)),
                        format!("{}: Thêm việc", key(&kb.new)),
                    ],
                    Focus::DayTasks | Focus::Outstanding => vec![
                        format!("{}: Xong/chưa xong", key(&kb.toggle_task_status)),
                        format!("{}: Thêm", key(&kb.new)),
                        format!("{}: Xóa", key(&kb.delete)),
                    ],
                    Focus::Subjects => vec![
                        format!("{}: Thêm môn", key(&kb.new)),
                        format!("{}: Thêm học phần", key(&kb.new_module)),
                        format!("{}: Đổi tên", key(&kb.edit)),
                        format!("{}: Xóa", key(&kb.delete)),
                    ],
                    Focus::Catalog => vec![
                        format!("{}: Thêm bài", key(&kb.new)),
                        format!("{}: Sửa", key(&kb.edit)),
                        format!("{}: Sao chép link", key(&kb.select)),
                        format!("{}: Dàn ý", key(&kb.outline)),
                        format!("{}: Xóa", key(&kb.delete)),
                    ],
                };
                hints.push(format!("{}: Nhập AI", key(&kb.import)));
                hints.push(format!("{}: Tìm", key(&kb.search)));
                hints.push(format!("{}: Trợ giúp", key(&kb.help)));
                hints.push(format!("{}: Thoát", key(&kb.quit)));
                hints
            }
        }
    }
}

fn step(index: &mut usize, len: usize, down: bool) {
    if len == 0 {
        *index = 0;
        return;
    }
    *index = if down {
        cmp::min(*index + 1, len - 1)
    } else {
        index.saturating_sub(1)
    };
}

fn validate_key_bindings(config: &Config) -> Result<(), TuiError> {
    for (name, binding) in config.key_bindings.entries() {
        parse_key_binding(binding)
            .map_err(|e| TuiError::KeyBindingError(format!("{} = '{}': {}", name, binding, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::outline::JsonOutlineService;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app() -> App {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let planner = Planner::load_with_ids(store, Box::new(SequentialIds::new())).unwrap();
        let mut app = App::new(Config::default(), planner, Arc::new(JsonOutlineService)).unwrap();
        app.today = day(2024, 5, 10);
        app.go_to_today();
        app
    }

    fn type_into_form(app: &mut App, text: &str) {
        let editor = app.input.as_mut().and_then(InputForm::current_editor_mut).unwrap();
        editor.insert_str(text);
    }

    #[test]
    fn test_invalid_key_binding_is_rejected() {
        let mut config = Config::default();
        config.key_bindings.quit = "Hyper+q".to_string();
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let planner = Planner::load(store).unwrap();
        let result = App::new(config, planner, Arc::new(JsonOutlineService));
        assert!(matches!(result, Err(TuiError::KeyBindingError(_))));
    }

    #[test]
    fn test_change_month_clears_selected_date() {
        let mut app = app();
        assert_eq!(app.planner.selected_date(), Some(day(2024, 5, 10)));

        app.change_month(true);
        assert_eq!(app.ui.month, MonthCursor::new(2024, 6));
        assert_eq!(app.ui.cursor, day(2024, 6, 1));
        assert_eq!(app.planner.selected_date(), None);
    }

    #[test]
    fn test_cursor_follows_into_previous_month() {
        let mut app = app();
        app.ui.cursor = day(2024, 5, 2);
        app.move_cursor(-7);
        assert_eq!(app.ui.cursor, day(2024, 4, 25));
        assert_eq!(app.ui.month, MonthCursor::new(2024, 4));
        assert_eq!(app.planner.selected_date(), Some(day(2024, 4, 25)));
    }

    #[test]
    fn test_add_and_toggle_task_on_selected_day() {
        let mut app = app();
        app.start_add();
        assert_eq!(app.ui.mode, Mode::Input);
        type_into_form(&mut app, "Chấm bài");
        app.submit_input();

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.day_tasks().len(), 1);

        app.ui.focus = Focus::DayTasks;
        app.toggle_selected_task();
        assert!(app.day_tasks()[0].completed);
    }

    #[test]
    fn test_empty_title_keeps_form_open() {
        let mut app = app();
        app.start_add_backlog();
        type_into_form(&mut app, "   ");
        app.submit_input();

        assert_eq!(app.ui.mode, Mode::Input);
        assert!(app.input.is_some());
        assert!(app.planner.tasks().is_empty());
    }

    #[test]
    fn test_delete_needs_second_press() {
        let mut app = app();
        app.planner.add_task(BACKLOG_KEY, "Đọc tài liệu").unwrap();
        app.ui.focus = Focus::Outstanding;

        let now = Instant::now();
        app.request_delete(now);
        assert_eq!(app.planner.tasks().task_count(), 1);
        app.request_delete(now + Duration::from_secs(1));
        assert_eq!(app.planner.tasks().task_count(), 0);
    }

    #[test]
    fn test_delete_arm_expires() {
        let mut app = app();
        app.planner.add_task(BACKLOG_KEY, "Đọc tài liệu").unwrap();
        app.ui.focus = Focus::Outstanding;

        let now = Instant::now();
        app.request_delete(now);
        app.request_delete(now + Duration::from_secs(4));
        assert_eq!(app.planner.tasks().task_count(), 1);
    }

    #[test]
    fn test_outstanding_entry_opens_its_day() {
        let mut app = app();
        app.planner.add_task("2024-4-3", "Nộp điểm").unwrap();
        app.ui.focus = Focus::Outstanding;
        app.open_outstanding_date();

        assert_eq!(app.ui.focus, Focus::DayTasks);
        assert_eq!(app.ui.month, MonthCursor::new(2024, 4));
        assert_eq!(app.planner.selected_date(), Some(day(2024, 4, 3)));
        assert_eq!(app.day_tasks().len(), 1);
    }

    #[test]
    fn test_catalog_rows_flatten_selected_subject() {
        let mut app = app();
        app.switch_view(View::Lessons);
        app.planner.add_lesson("s1", "m1", "Bài 1", Some("https://x.y")).unwrap();
        app.planner.add_lesson("s1", "m1", "Bài 2", None).unwrap();

        let rows = app.catalog_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CatalogRow::Module { module_id: "m1".to_string() });
        assert!(matches!(&rows[2], CatalogRow::Lesson { module_id, .. } if module_id == "m1"));
    }

    #[test]
    fn test_edit_lesson_form_is_prefilled() {
        let mut app = app();
        app.switch_view(View::Lessons);
        app.planner.add_lesson("s1", "m1", "Bài 1", Some("https://x.y")).unwrap();
        app.ui.focus = Focus::Catalog;
        app.ui.catalog_index = 1;
        app.start_edit();

        let form = app.input.as_ref().unwrap();
        assert_eq!(form.value(0), "Bài 1");
        assert_eq!(form.value(1), "https://x.y");
    }

    #[test]
    fn test_subject_navigation_follows_visible_list() {
        let mut app = app();
        app.switch_view(View::Lessons);
        app.move_selection(true);
        assert_eq!(app.planner.selected_subject_id(), Some("s2"));
        app.move_selection(true);
        assert_eq!(app.planner.selected_subject_id(), Some("s2"));
        app.move_selection(false);
        assert_eq!(app.planner.selected_subject_id(), Some("s1"));
    }

    #[test]
    fn test_background_import_applies_on_poll() {
        let mut app = app();
        app.open_import();
        app.import_editor
            .insert_str(r#"[{"name": "Lý", "modules": [{"lessons": [{"name": "L1"}]}]}]"#);
        app.submit_import();
        assert!(app.planner.is_importing());

        for _ in 0..200 {
            app.poll_jobs();
            if !app.planner.is_importing() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(!app.planner.is_importing());
        assert_eq!(app.planner.catalog().len(), 3);
        assert_eq!(app.ui.mode, Mode::View);
        assert!(app.import_editor.is_empty());
    }

    #[test]
    fn test_failed_import_keeps_modal_and_text() {
        let mut app = app();
        app.open_import();
        app.import_editor.insert_str("không phải JSON");
        app.submit_import();

        for _ in 0..200 {
            app.poll_jobs();
            if !app.planner.is_importing() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(app.ui.mode, Mode::Import);
        assert_eq!(app.import_editor.text(), "không phải JSON");
        assert_eq!(app.planner.catalog().len(), 2);
    }

    struct PanickingService;

    impl OutlineService for PanickingService {
        fn parse_sheet(&self, _raw_text: &str) -> Result<Vec<ImportedSubject>, OutlineError> {
            panic!("service crashed");
        }

        fn lesson_outline(&self, _subject: &str, _topic: &str) -> Result<String, OutlineError> {
            panic!("service crashed");
        }
    }

    #[test]
    fn test_crashed_import_worker_releases_import_gate() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let planner = Planner::load_with_ids(store, Box::new(SequentialIds::new())).unwrap();
        let mut app = App::new(Config::default(), planner, Arc::new(PanickingService)).unwrap();
        app.open_import();
        app.import_editor.insert_str("[]");
        app.submit_import();

        for _ in 0..200 {
            app.poll_jobs();
            if !app.planner.is_importing() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(!app.planner.is_importing());
        assert_eq!(app.ui.mode, Mode::Import);
        assert!(app.status.message.is_some());
        assert!(app.planner.begin_import().is_ok());
    }
}
