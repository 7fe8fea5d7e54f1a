use chrono::NaiveDate;
use eduplan::outline::JsonOutlineService;
use eduplan::store::{SUBJECTS_KEY, TASKS_KEY};
use eduplan::{KeyValueStore, Planner, SqliteStore, View};
use std::path::Path;
use tempfile::TempDir;

fn open(path: &Path) -> Planner<SqliteStore> {
    let store = SqliteStore::open(path).unwrap();
    Planner::load(store).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn tasks_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("planner.db");

    let task_id = {
        let mut planner = open(&db);
        let id = planner.add_task("2024-5-3", "Chấm bài kiểm tra").unwrap().unwrap();
        planner.add_task("backlog", "Soạn đề cương").unwrap().unwrap();
        planner.toggle_task("2024-5-3", &id).unwrap();
        id
    };

    let planner = open(&db);
    let day = planner.tasks().tasks_on("2024-5-3");
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].id, task_id);
    assert!(day[0].completed);
    assert_eq!(planner.tasks().tasks_on("backlog").len(), 1);
}

#[test]
fn outstanding_lists_backlog_then_overdue_newest_first() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir.path().join("planner.db"));

    planner.add_task("2024-5-1", "Cũ nhất").unwrap();
    planner.add_task("2024-5-8", "Gần đây").unwrap();
    planner.add_task("2024-5-10", "Hôm nay").unwrap();
    planner.add_task("backlog", "Không hạn").unwrap();
    let done = planner.add_task("2024-5-7", "Đã xong").unwrap().unwrap();
    planner.toggle_task("2024-5-7", &done).unwrap();

    let outstanding = planner.outstanding(date(2024, 5, 10));
    let titles: Vec<&str> = outstanding.iter().map(|e| e.task.title.as_str()).collect();
    assert_eq!(titles, vec!["Không hạn", "Gần đây", "Cũ nhất"]);
    assert!(outstanding.iter().next().unwrap().is_backlog());
}

#[test]
fn completed_backlog_tasks_stay_outstanding() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir.path().join("planner.db"));

    let id = planner.add_task("backlog", "Đọc tài liệu").unwrap().unwrap();
    planner.toggle_task("backlog", &id).unwrap();

    let outstanding = planner.outstanding(date(2024, 5, 10));
    assert_eq!(outstanding.len(), 1);
    assert!(outstanding.iter().next().unwrap().task.completed);
}

#[test]
fn catalog_edits_are_written_to_the_subjects_blob() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("planner.db");

    let (subject_id, module_id, lesson_id) = {
        let mut planner = open(&db);
        let subject_id = planner.add_subject("Hóa học").unwrap().unwrap();
        let module_id = planner.add_module(&subject_id, "Hữu cơ").unwrap().unwrap();
        let lesson_id = planner
            .add_lesson(&subject_id, &module_id, "Ankan", Some("https://example.com/ankan"))
            .unwrap()
            .unwrap();
        planner
            .update_lesson(&subject_id, &module_id, &lesson_id, "Ankan và xicloankan", None)
            .unwrap()
            .unwrap();
        (subject_id, module_id, lesson_id)
    };

    let store = SqliteStore::open(&db).unwrap();
    assert!(store.get(SUBJECTS_KEY).unwrap().is_some());
    assert!(store.get(TASKS_KEY).unwrap().is_none());

    let planner = Planner::load(store).unwrap();
    let subject = planner.catalog().subject(&subject_id).unwrap();
    let module = subject.modules.iter().find(|m| m.id == module_id).unwrap();
    let lesson = module.lessons.iter().find(|l| l.id == lesson_id).unwrap();
    assert_eq!(lesson.name, "Ankan và xicloankan");
    assert_eq!(lesson.url(), None);
}

#[test]
fn json_import_fills_defaults_and_assigns_fresh_ids() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir.path().join("planner.db"));
    let before = planner.catalog().len();

    let payload = r#"```json
[{"name": "Lý", "modules": [{"lessons": [{"name": "L1"}]}]}]
```"#;
    let ids = planner.import_text(&JsonOutlineService, payload).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(planner.catalog().len(), before + 1);
    assert!(!planner.is_importing());

    let subject = planner.catalog().subject(&ids[0]).unwrap();
    assert_eq!(subject.name, "Lý");
    assert_eq!(subject.modules.len(), 1);
    assert_eq!(subject.modules[0].name, "Học phần chung");
    let lesson = &subject.modules[0].lessons[0];
    assert_eq!(lesson.name, "L1");
    assert_eq!(lesson.url, "");

    let others = planner.catalog().subjects().iter().filter(|s| s.id == subject.id).count();
    assert_eq!(others, 1);
}

#[test]
fn search_narrows_both_views() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir.path().join("planner.db"));

    let subject_id = planner.add_subject("Sinh học").unwrap().unwrap();
    let module_id = planner.add_module(&subject_id, "Di truyền").unwrap().unwrap();
    planner.add_lesson(&subject_id, &module_id, "Phân bào", None).unwrap();
    planner.add_task("backlog", "Phân loại hồ sơ").unwrap();
    planner.add_task("backlog", "Họp tổ").unwrap();

    planner.select_view(View::Lessons);
    planner.set_search_query("phân");

    let visible = planner.visible_subjects();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id(), subject_id);
    assert_eq!(planner.selected_subject_id(), Some(subject_id.as_str()));

    let outstanding = planner.outstanding(date(2024, 5, 10));
    assert_eq!(outstanding.len(), 1);
}
