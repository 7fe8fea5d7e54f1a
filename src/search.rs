//! Case-insensitive substring search over the task buckets and the lesson catalog.
//!
//! Every function here builds a read-only projection from scratch; nothing
//! mutates the underlying models.

use crate::models::{LearningModule, Lesson, Subject, Task};

/// A lower-cased search query. The empty query matches everything.
///
/// Whitespace is kept as typed, so `"bài "` does not match a lesson named `"Bài"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.is_empty() || candidate.to_lowercase().contains(&self.needle)
    }

    pub fn matches_lesson(&self, lesson: &Lesson) -> bool {
        self.matches(&lesson.name)
    }

    /// Module name matches, or any of its lessons does
    pub fn matches_module(&self, module: &LearningModule) -> bool {
        self.matches(&module.name) || module.lessons.iter().any(|l| self.matches_lesson(l))
    }

    /// Subject name matches, or anything below it does
    pub fn matches_subject(&self, subject: &Subject) -> bool {
        self.matches(&subject.name) || subject.modules.iter().any(|m| self.matches_module(m))
    }
}

/// A subject kept by the filter, with its visible modules
#[derive(Debug, Clone)]
pub struct SubjectView<'a> {
    pub subject: &'a Subject,
    pub modules: Vec<ModuleView<'a>>,
}

impl<'a> SubjectView<'a> {
    pub fn id(&self) -> &'a str {
        &self.subject.id
    }

    /// The subject matched on its own name but nothing inside it does
    pub fn has_no_visible_content(&self) -> bool {
        self.modules.is_empty() && !self.subject.modules.is_empty()
    }
}

/// A module kept by the filter, with only its matching lessons
#[derive(Debug, Clone)]
pub struct ModuleView<'a> {
    pub module: &'a LearningModule,
    pub lessons: Vec<&'a Lesson>,
}

/// Filter the catalog level by level.
///
/// A subject stays if its subtree contains a match. Inside it, a module stays
/// if its name or one of its lessons matches, and only matching lessons are
/// listed. The checks at each level are independent, so a module retained for
/// one matching lesson shows just that lesson.
pub fn filter_catalog<'a>(subjects: &'a [Subject], query: &SearchQuery) -> Vec<SubjectView<'a>> {
    subjects
        .iter()
        .filter(|s| query.matches_subject(s))
        .map(|subject| SubjectView {
            subject,
            modules: filter_modules(&subject.modules, query),
        })
        .collect()
}

pub fn filter_modules<'a>(modules: &'a [LearningModule], query: &SearchQuery) -> Vec<ModuleView<'a>> {
    modules
        .iter()
        .filter(|m| query.matches_module(m))
        .map(|module| ModuleView {
            module,
            lessons: module
                .lessons
                .iter()
                .filter(|l| query.matches_lesson(l))
                .collect(),
        })
        .collect()
}

/// Tasks whose title contains the query, in stored order
pub fn filter_tasks<'a>(tasks: &'a [Task], query: &SearchQuery) -> Vec<&'a Task> {
    tasks.iter().filter(|t| query.matches(&t.title)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str, name: &str) -> Lesson {
        Lesson::new(id.to_string(), name.to_string(), None)
    }

    fn module(id: &str, name: &str, lessons: Vec<Lesson>) -> LearningModule {
        LearningModule {
            id: id.to_string(),
            name: name.to_string(),
            lessons,
        }
    }

    fn subject(id: &str, name: &str, modules: Vec<LearningModule>) -> Subject {
        Subject {
            id: id.to_string(),
            name: name.to_string(),
            icon: "fa-book".to_string(),
            modules,
        }
    }

    fn sample() -> Vec<Subject> {
        vec![
            subject(
                "s1",
                "Toán",
                vec![
                    module("m1", "Đại số", vec![lesson("l1", "Bài 1"), lesson("l2", "Phương trình")]),
                    module("m2", "Hình học", vec![lesson("l3", "Tam giác")]),
                ],
            ),
            subject("s2", "Văn", vec![module("m3", "Thơ", vec![lesson("l4", "Bài thơ mùa thu")])]),
            subject("s3", "Lý", vec![module("m4", "Cơ học", vec![])]),
        ]
    }

    #[test]
    fn test_empty_query_is_identity() {
        let subjects = sample();
        let views = filter_catalog(&subjects, &SearchQuery::new(""));
        assert_eq!(views.len(), 3);
        for (view, subject) in views.iter().zip(subjects.iter()) {
            assert_eq!(view.modules.len(), subject.modules.len());
            for (mv, m) in view.modules.iter().zip(subject.modules.iter()) {
                assert_eq!(mv.lessons.len(), m.lessons.len());
            }
        }
    }

    #[test]
    fn test_whitespace_is_part_of_the_query() {
        let subjects = sample();
        assert!(filter_catalog(&subjects, &SearchQuery::new("tam giác ")).is_empty());
        assert!(filter_catalog(&subjects, &SearchQuery::new("   ")).is_empty());

        let views = filter_catalog(&subjects, &SearchQuery::new("bài "));
        let lessons: Vec<&str> = views
            .iter()
            .flat_map(|v| v.modules.iter().flat_map(|m| m.lessons.iter().map(|l| l.name.as_str())))
            .collect();
        assert_eq!(lessons, vec!["Bài 1", "Bài thơ mùa thu"]);
    }

    #[test]
    fn test_lesson_match_narrows_each_level() {
        let subjects = sample();
        let views = filter_catalog(&subjects, &SearchQuery::new("BÀI"));
        let ids: Vec<&str> = views.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let toan = &views[0];
        assert_eq!(toan.modules.len(), 1);
        assert_eq!(toan.modules[0].module.id, "m1");
        let lessons: Vec<&str> = toan.modules[0].lessons.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(lessons, vec!["Bài 1"]);
    }

    #[test]
    fn test_module_name_match_keeps_module_but_filters_lessons() {
        let subjects = sample();
        let views = filter_catalog(&subjects, &SearchQuery::new("hình"));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].modules.len(), 1);
        assert!(views[0].modules[0].lessons.is_empty());
    }

    #[test]
    fn test_subject_name_match_without_inner_match() {
        let subjects = sample();
        let views = filter_catalog(&subjects, &SearchQuery::new("lý"));
        assert_eq!(views.len(), 1);
        assert!(views[0].has_no_visible_content());
    }

    #[test]
    fn test_every_retained_subject_contains_a_match() {
        let subjects = sample();
        for raw in ["a", "b", "ơ", "tam", "x", "1"] {
            let query = SearchQuery::new(raw);
            for view in filter_catalog(&subjects, &query) {
                let s = view.subject;
                let found = query.matches(&s.name)
                    || s.modules.iter().any(|m| {
                        query.matches(&m.name) || m.lessons.iter().any(|l| query.matches(&l.name))
                    });
                assert!(found, "subject {} retained for '{}' without a match", s.name, raw);
            }
        }
    }

    #[test]
    fn test_filter_tasks_is_case_insensitive() {
        let tasks = vec![
            Task::new("t-1".to_string(), "Chuẩn bị SLIDE".to_string()),
            Task::new("t-2".to_string(), "Chấm bài".to_string()),
        ];
        let hits = filter_tasks(&tasks, &SearchQuery::new("slide"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t-1");
    }
}
