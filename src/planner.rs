//! Session orchestrator.
//!
//! [`Planner`] owns the task buckets and the catalog, routes every user action
//! to the matching model operation, and writes a full snapshot of whatever
//! changed to the store afterwards. It also keeps the session-only state the
//! presentation layer needs: active view, search query, selected date and
//! subject, and the import loading flag. None of that is persisted.
//!
//! Mutations referencing ids that no longer exist are no-ops: they return
//! `Ok(None)`, log at debug, and skip the write.

use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::ImportedSubject;
use crate::ids::{IdGenerator, UuidIds};
use crate::models::{Catalog, DailyTasks, LearningModule, Lesson, ModelError, Subject, Task, View};
use crate::outline::{OutlineError, OutlineService};
use crate::search::{SearchQuery, SubjectView, filter_catalog};
use crate::selection::reconcile_selection;
use crate::store::{self, KeyValueStore, StoreError};
use crate::tasks::Outstanding;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Import failed: {0}")]
    Outline(#[from] OutlineError),
    #[error("An import is already running")]
    ImportInProgress,
}

#[derive(Debug, Clone, Copy)]
enum Snapshot {
    Tasks,
    Catalog,
}

pub struct Planner<S: KeyValueStore> {
    tasks: DailyTasks,
    catalog: Catalog,
    ids: Box<dyn IdGenerator>,
    store: S,
    view: View,
    search: SearchQuery,
    search_text: String,
    selected_date: Option<NaiveDate>,
    selected_subject: Option<String>,
    import_in_progress: bool,
}

impl<S: KeyValueStore> Planner<S> {
    /// Load both blobs from the store, falling back to defaults
    pub fn load(store: S) -> Result<Self, PlannerError> {
        Self::load_with_ids(store, Box::new(UuidIds))
    }

    pub fn load_with_ids(store: S, ids: Box<dyn IdGenerator>) -> Result<Self, PlannerError> {
        let tasks = store::load_tasks(&store)?;
        let catalog = store::load_catalog(&store)?;
        tracing::info!(
            tasks = tasks.task_count(),
            subjects = catalog.len(),
            "planner state loaded"
        );

        let mut planner = Self {
            tasks,
            catalog,
            ids,
            store,
            view: View::default(),
            search: SearchQuery::default(),
            search_text: String::new(),
            selected_date: None,
            selected_subject: None,
            import_in_progress: false,
        };
        planner.reconcile_subject();
        Ok(planner)
    }

    pub fn tasks(&self) -> &DailyTasks {
        &self.tasks
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn search(&self) -> &SearchQuery {
        &self.search
    }

    /// The query as typed, before normalization
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_subject_id(&self) -> Option<&str> {
        self.selected_subject.as_deref()
    }

    pub fn is_importing(&self) -> bool {
        self.import_in_progress
    }

    // ---- tasks ----

    pub fn add_task(&mut self, date_key: &str, title: &str) -> Result<Option<String>, PlannerError> {
        let result = self.tasks.add_task(date_key, title, self.ids.as_mut());
        self.settle("add task", result, Snapshot::Tasks)
    }

    pub fn toggle_task(&mut self, date_key: &str, task_id: &str) -> Result<Option<bool>, PlannerError> {
        let result = self.tasks.toggle_task(date_key, task_id);
        self.settle("toggle task", result, Snapshot::Tasks)
    }

    pub fn delete_task(&mut self, date_key: &str, task_id: &str) -> Result<Option<Task>, PlannerError> {
        let result = self.tasks.delete_task(date_key, task_id);
        self.settle("delete task", result, Snapshot::Tasks)
    }

    pub fn outstanding(&self, today: NaiveDate) -> Outstanding<'_> {
        self.tasks.outstanding(today, &self.search)
    }

    // ---- catalog ----

    pub fn add_subject(&mut self, name: &str) -> Result<Option<String>, PlannerError> {
        let result = self.catalog.add_subject(name, self.ids.as_mut());
        self.settle("add subject", result, Snapshot::Catalog)
    }

    pub fn rename_subject(&mut self, subject_id: &str, name: &str) -> Result<Option<()>, PlannerError> {
        let result = self.catalog.rename_subject(subject_id, name);
        self.settle("rename subject", result, Snapshot::Catalog)
    }

    pub fn delete_subject(&mut self, subject_id: &str) -> Result<Option<Subject>, PlannerError> {
        let result = self.catalog.delete_subject(subject_id);
        self.settle("delete subject", result, Snapshot::Catalog)
    }

    pub fn add_module(&mut self, subject_id: &str, name: &str) -> Result<Option<String>, PlannerError> {
        let result = self.catalog.add_module(subject_id, name, self.ids.as_mut());
        self.settle("add module", result, Snapshot::Catalog)
    }

    pub fn rename_module(
        &mut self,
        subject_id: &str,
        module_id: &str,
        name: &str,
    ) -> Result<Option<()>, PlannerError> {
        let result = self.catalog.rename_module(subject_id, module_id, name);
        self.settle("rename module", result, Snapshot::Catalog)
    }

    pub fn delete_module(
        &mut self,
        subject_id: &str,
        module_id: &str,
    ) -> Result<Option<LearningModule>, PlannerError> {
        let result = self.catalog.delete_module(subject_id, module_id);
        self.settle("delete module", result, Snapshot::Catalog)
    }

    pub fn add_lesson(
        &mut self,
        subject_id: &str,
        module_id: &str,
        name: &str,
        url: Option<&str>,
    ) -> Result<Option<String>, PlannerError> {
        let result = self
            .catalog
            .add_lesson(subject_id, module_id, name, url, self.ids.as_mut());
        self.settle("add lesson", result, Snapshot::Catalog)
    }

    pub fn update_lesson(
        &mut self,
        subject_id: &str,
        module_id: &str,
        lesson_id: &str,
        name: &str,
        url: Option<&str>,
    ) -> Result<Option<()>, PlannerError> {
        let result = self
            .catalog
            .update_lesson(subject_id, module_id, lesson_id, name, url);
        self.settle("update lesson", result, Snapshot::Catalog)
    }

    pub fn delete_lesson(
        &mut self,
        subject_id: &str,
        module_id: &str,
        lesson_id: &str,
    ) -> Result<Option<Lesson>, PlannerError> {
        let result = self.catalog.delete_lesson(subject_id, module_id, lesson_id);
        self.settle("delete lesson", result, Snapshot::Catalog)
    }

    /// Append already-parsed subjects. Returns the new subject ids.
    pub fn bulk_import(&mut self, imported: Vec<ImportedSubject>) -> Result<Vec<String>, PlannerError> {
        let ids = self.catalog.bulk_import(imported, self.ids.as_mut());
        tracing::info!(subjects = ids.len(), "bulk import applied");
        self.reconcile_subject();
        self.persist(Snapshot::Catalog)?;
        Ok(ids)
    }

    // ---- import gate ----

    /// Raise the loading flag. Fails while another import is running.
    pub fn begin_import(&mut self) -> Result<(), PlannerError> {
        if self.import_in_progress {
            return Err(PlannerError::ImportInProgress);
        }
        self.import_in_progress = true;
        Ok(())
    }

    /// Clear the loading flag and apply the service result. On error the
    /// catalog is left untouched.
    pub fn finish_import(
        &mut self,
        result: Result<Vec<ImportedSubject>, OutlineError>,
    ) -> Result<Vec<String>, PlannerError> {
        self.import_in_progress = false;
        match result {
            Ok(imported) => self.bulk_import(imported),
            Err(e) => {
                tracing::warn!(error = %e, "import failed, catalog unchanged");
                Err(e.into())
            }
        }
    }

    /// Run a whole import synchronously through `service`.
    /// Blank input does nothing.
    pub fn import_text(
        &mut self,
        service: &dyn OutlineService,
        raw_text: &str,
    ) -> Result<Vec<String>, PlannerError> {
        if raw_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.begin_import()?;
        let result = service.parse_sheet(raw_text);
        self.finish_import(result)
    }

    // ---- session state ----

    pub fn set_search_query(&mut self, raw: &str) {
        self.search_text = raw.to_string();
        self.search = SearchQuery::new(raw);
        self.reconcile_subject();
    }

    pub fn select_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn select_date(&mut self, date: Option<NaiveDate>) {
        self.selected_date = date;
    }

    pub fn select_subject(&mut self, subject_id: &str) {
        self.selected_subject = Some(subject_id.to_string());
        self.reconcile_subject();
    }

    /// Subjects visible under the current search, with their visible modules and lessons
    pub fn visible_subjects(&self) -> Vec<SubjectView<'_>> {
        filter_catalog(self.catalog.subjects(), &self.search)
    }

    /// The selected subject as currently visible
    pub fn current_subject(&self) -> Option<SubjectView<'_>> {
        let selected = self.selected_subject.as_deref()?;
        self.visible_subjects().into_iter().find(|v| v.id() == selected)
    }

    fn reconcile_subject(&mut self) {
        let visible = filter_catalog(self.catalog.subjects(), &self.search);
        let next = reconcile_selection(visible.iter().map(|v| v.id()), self.selected_subject.as_deref());
        if next != self.selected_subject {
            tracing::debug!(from = ?self.selected_subject, to = ?next, "subject selection moved");
        }
        self.selected_subject = next;
    }

    fn settle<T>(
        &mut self,
        action: &'static str,
        result: Result<T, ModelError>,
        snapshot: Snapshot,
    ) -> Result<Option<T>, PlannerError> {
        match result {
            Ok(value) => {
                if matches!(snapshot, Snapshot::Catalog) {
                    self.reconcile_subject();
                }
                self.persist(snapshot)?;
                Ok(Some(value))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(action, error = %e, "stale reference, nothing changed");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&mut self, snapshot: Snapshot) -> Result<(), PlannerError> {
        let result = match snapshot {
            Snapshot::Tasks => store::save_tasks(&mut self.store, &self.tasks),
            Snapshot::Catalog => store::save_catalog(&mut self.store, &self.catalog),
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, ?snapshot, "failed to persist state");
        }
        Ok(result?)
    }
}
