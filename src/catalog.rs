//! Lesson catalog: Subject → Module → Lesson, with create/rename/delete at every level.
//!
//! Every operation resolves the ids it is given before changing anything, so a
//! stale id returns an error and leaves the catalog exactly as it was.

use crate::ids::{EntityKind, IdGenerator};
use crate::models::{Catalog, LearningModule, Lesson, ModelError, Subject};

pub const DEFAULT_SUBJECT_ICON: &str = "fa-folder";
pub const FIRST_MODULE_NAME: &str = "Học phần 1";
pub const IMPORTED_SUBJECT_ICON: &str = "fa-book";
pub const IMPORTED_MODULE_NAME: &str = "Học phần chung";
const SEED_MODULE_NAME: &str = "Học phần cơ bản";

/// Subject tree as it arrives from an import, before ids and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSubject {
    pub name: String,
    pub icon: Option<String>,
    pub modules: Vec<ImportedModule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedModule {
    pub name: Option<String>,
    pub lessons: Vec<ImportedLesson>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLesson {
    pub name: String,
    pub url: Option<String>,
}

fn clean_name(name: &str) -> Result<String, ModelError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ModelError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl Catalog {
    /// Catalog used when nothing has been stored yet
    pub fn seed() -> Self {
        let seed = |id: &str, name: &str, icon: &str, module_id: &str| Subject {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            modules: vec![LearningModule::new(module_id.to_string(), SEED_MODULE_NAME.to_string())],
        };
        Self::from_subjects(vec![
            seed("s1", "SNLT", "fa-code", "m1"),
            seed("s2", "TGVVTM", "fa-palette", "m2"),
        ])
    }

    fn subject_index(&self, subject_id: &str) -> Result<usize, ModelError> {
        self.subjects
            .iter()
            .position(|s| s.id == subject_id)
            .ok_or_else(|| ModelError::SubjectNotFound(subject_id.to_string()))
    }

    fn module_mut(&mut self, subject_id: &str, module_id: &str) -> Result<&mut LearningModule, ModelError> {
        let index = self.subject_index(subject_id)?;
        self.subjects[index]
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .ok_or_else(|| ModelError::ModuleNotFound {
                subject_id: subject_id.to_string(),
                module_id: module_id.to_string(),
            })
    }

    fn subject_id_taken(&self) -> impl Fn(&str) -> bool + '_ {
        |id: &str| self.subjects.iter().any(|s| s.id == id)
    }

    /// Append a subject seeded with one empty module. Returns the new subject id.
    pub fn add_subject(&mut self, name: &str, ids: &mut dyn IdGenerator) -> Result<String, ModelError> {
        let name = clean_name(name)?;
        let id = ids.unique_id(EntityKind::Subject, &self.subject_id_taken());
        let module_id = ids.next_id(EntityKind::Module);
        self.subjects.push(Subject {
            id: id.clone(),
            name,
            icon: DEFAULT_SUBJECT_ICON.to_string(),
            modules: vec![LearningModule::new(module_id, FIRST_MODULE_NAME.to_string())],
        });
        Ok(id)
    }

    pub fn rename_subject(&mut self, subject_id: &str, name: &str) -> Result<(), ModelError> {
        let index = self.subject_index(subject_id)?;
        self.subjects[index].name = clean_name(name)?;
        Ok(())
    }

    /// Remove a subject together with all of its modules and lessons
    pub fn delete_subject(&mut self, subject_id: &str) -> Result<Subject, ModelError> {
        let index = self.subject_index(subject_id)?;
        Ok(self.subjects.remove(index))
    }

    pub fn add_module(
        &mut self,
        subject_id: &str,
        name: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, ModelError> {
        let index = self.subject_index(subject_id)?;
        let name = clean_name(name)?;
        let subject = &mut self.subjects[index];
        let modules = &subject.modules;
        let id = ids.unique_id(EntityKind::Module, &|id: &str| modules.iter().any(|m| m.id == id));
        subject.modules.push(LearningModule::new(id.clone(), name));
        Ok(id)
    }

    pub fn rename_module(&mut self, subject_id: &str, module_id: &str, name: &str) -> Result<(), ModelError> {
        let name = clean_name(name)?;
        self.module_mut(subject_id, module_id)?.name = name;
        Ok(())
    }

    /// Remove a module together with its lessons
    pub fn delete_module(&mut self, subject_id: &str, module_id: &str) -> Result<LearningModule, ModelError> {
        let index = self.subject_index(subject_id)?;
        let modules = &mut self.subjects[index].modules;
        let position = modules
            .iter()
            .position(|m| m.id == module_id)
            .ok_or_else(|| ModelError::ModuleNotFound {
                subject_id: subject_id.to_string(),
                module_id: module_id.to_string(),
            })?;
        Ok(modules.remove(position))
    }

    pub fn add_lesson(
        &mut self,
        subject_id: &str,
        module_id: &str,
        name: &str,
        url: Option<&str>,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, ModelError> {
        let name = clean_name(name)?;
        let module = self.module_mut(subject_id, module_id)?;
        let lessons = &module.lessons;
        let id = ids.unique_id(EntityKind::Lesson, &|id: &str| lessons.iter().any(|l| l.id == id));
        module
            .lessons
            .push(Lesson::new(id.clone(), name, non_blank(url)));
        Ok(id)
    }

    /// Replace a lesson's name and link. A blank `url` clears the link.
    pub fn update_lesson(
        &mut self,
        subject_id: &str,
        module_id: &str,
        lesson_id: &str,
        name: &str,
        url: Option<&str>,
    ) -> Result<(), ModelError> {
        let name = clean_name(name)?;
        let lesson = self
            .module_mut(subject_id, module_id)?
            .lessons
            .iter_mut()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| ModelError::LessonNotFound {
                module_id: module_id.to_string(),
                lesson_id: lesson_id.to_string(),
            })?;
        lesson.name = name;
        lesson.url = non_blank(url).unwrap_or_default();
        Ok(())
    }

    pub fn delete_lesson(&mut self, subject_id: &str, module_id: &str, lesson_id: &str) -> Result<Lesson, ModelError> {
        let module = self.module_mut(subject_id, module_id)?;
        let position = module
            .lessons
            .iter()
            .position(|l| l.id == lesson_id)
            .ok_or_else(|| ModelError::LessonNotFound {
                module_id: module_id.to_string(),
                lesson_id: lesson_id.to_string(),
            })?;
        Ok(module.lessons.remove(position))
    }

    /// Append imported subjects with fresh ids at every level.
    ///
    /// Missing icons, module names and lesson links get defaults. Nothing is
    /// merged with existing subjects: importing the same data twice yields
    /// duplicates by name. Returns the ids of the appended subjects.
    pub fn bulk_import(&mut self, imported: Vec<ImportedSubject>, ids: &mut dyn IdGenerator) -> Vec<String> {
        let mut added = Vec::with_capacity(imported.len());

        for source in imported {
            let subject_id = ids.unique_id(EntityKind::Subject, &|id: &str| {
                self.subjects.iter().any(|s| s.id == id) || added.iter().any(|a: &String| a == id)
            });

            let mut modules: Vec<LearningModule> = Vec::with_capacity(source.modules.len());
            for imported_module in source.modules {
                let module_id = ids.unique_id(EntityKind::Module, &|id: &str| modules.iter().any(|m| m.id == id));
                let name = non_blank(imported_module.name.as_deref())
                    .unwrap_or_else(|| IMPORTED_MODULE_NAME.to_string());
                let mut module = LearningModule::new(module_id, name);

                for imported_lesson in imported_module.lessons {
                    let lessons = &module.lessons;
                    let lesson_id = ids.unique_id(EntityKind::Lesson, &|id: &str| lessons.iter().any(|l| l.id == id));
                    module.lessons.push(Lesson::new(
                        lesson_id,
                        imported_lesson.name.trim().to_string(),
                        non_blank(imported_lesson.url.as_deref()),
                    ));
                }
                modules.push(module);
            }

            self.subjects.push(Subject {
                id: subject_id.clone(),
                name: source.name.trim().to_string(),
                icon: non_blank(source.icon.as_deref()).unwrap_or_else(|| IMPORTED_SUBJECT_ICON.to_string()),
                modules,
            });
            added.push(subject_id);
        }

        tracing::debug!(count = added.len(), "bulk import appended subjects");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{SequentialIds, UuidIds};

    fn catalog_with_lesson() -> (Catalog, String, String, String) {
        let mut catalog = Catalog::new();
        let mut ids = SequentialIds::new();
        let s = catalog.add_subject("Toán", &mut ids).unwrap();
        let m = catalog.subject(&s).unwrap().modules[0].id.clone();
        let l = catalog.add_lesson(&s, &m, "Bài 1", Some("http://x"), &mut ids).unwrap();
        (catalog, s, m, l)
    }

    #[test]
    fn test_add_subject_seeds_one_default_module() {
        let mut catalog = Catalog::new();
        let mut ids = SequentialIds::new();
        let id = catalog.add_subject("  Toán ", &mut ids).unwrap();
        let subject = catalog.subject(&id).unwrap();
        assert_eq!(subject.name, "Toán");
        assert_eq!(subject.icon, DEFAULT_SUBJECT_ICON);
        assert_eq!(subject.modules.len(), 1);
        assert_eq!(subject.modules[0].name, FIRST_MODULE_NAME);
        assert!(subject.modules[0].lessons.is_empty());
    }

    #[test]
    fn test_blank_names_are_rejected_without_mutation() {
        let (mut catalog, s, m, l) = catalog_with_lesson();
        let before = catalog.clone();
        let mut ids = SequentialIds::starting_at(100);
        assert_eq!(catalog.add_subject(" ", &mut ids), Err(ModelError::EmptyName));
        assert_eq!(catalog.rename_module(&s, &m, ""), Err(ModelError::EmptyName));
        assert_eq!(catalog.update_lesson(&s, &m, &l, "\t", None), Err(ModelError::EmptyName));
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut catalog = Catalog::new();
        let mut ids = SequentialIds::new();
        let s = catalog.add_subject("Toán", &mut ids).unwrap();
        for name in ["a", "b", "c"] {
            catalog.add_module(&s, name, &mut ids).unwrap();
        }
        let names: Vec<&str> = catalog.subject(&s).unwrap().modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec![FIRST_MODULE_NAME, "a", "b", "c"]);

        let m = catalog.subject(&s).unwrap().modules[0].id.clone();
        for name in ["a", "b", "c"] {
            catalog.add_lesson(&s, &m, name, None, &mut ids).unwrap();
        }
        let lessons: Vec<&str> = catalog.subject(&s).unwrap().modules[0]
            .lessons
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(lessons, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rename_and_update_in_place() {
        let (mut catalog, s, m, l) = catalog_with_lesson();
        catalog.rename_subject(&s, "Toán nâng cao").unwrap();
        catalog.rename_module(&s, &m, "Đại số").unwrap();
        catalog.update_lesson(&s, &m, &l, "Bài 1 (sửa)", Some("  ")).unwrap();

        let subject = catalog.subject(&s).unwrap();
        assert_eq!(subject.name, "Toán nâng cao");
        assert_eq!(subject.modules[0].name, "Đại số");
        assert_eq!(subject.modules[0].lessons[0].name, "Bài 1 (sửa)");
        assert_eq!(subject.modules[0].lessons[0].url(), None);
    }

    #[test]
    fn test_missing_references_leave_catalog_unchanged() {
        let (mut catalog, s, m, l) = catalog_with_lesson();
        let before = catalog.clone();
        let mut ids = SequentialIds::starting_at(100);

        assert!(catalog.delete_subject("ghost").is_err());
        assert!(catalog.delete_module(&s, "ghost").is_err());
        assert!(catalog.delete_module("ghost", &m).is_err());
        assert!(catalog.delete_lesson(&s, &m, "ghost").is_err());
        assert!(catalog.add_lesson(&s, "ghost", "x", None, &mut ids).is_err());
        assert!(catalog.add_module("ghost", "x", &mut ids).is_err());
        assert!(catalog.update_lesson("ghost", &m, &l, "x", None).is_err());
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_delete_module_cascades_to_lessons() {
        let (mut catalog, s, m, l) = catalog_with_lesson();
        let removed = catalog.delete_module(&s, &m).unwrap();
        assert_eq!(removed.lessons.len(), 1);
        let subject = catalog.subject(&s).unwrap();
        assert!(subject.modules.iter().all(|module| module.lessons.iter().all(|lesson| lesson.id != l)));
        assert!(subject.modules.is_empty());
    }

    #[test]
    fn test_delete_subject_cascades() {
        let (mut catalog, s, _, _) = catalog_with_lesson();
        catalog.delete_subject(&s).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.delete_subject(&s).is_err());
    }

    #[test]
    fn test_bulk_import_applies_defaults_and_fresh_ids() {
        let mut catalog = Catalog::seed();
        let existing: Vec<String> = catalog.subjects().iter().map(|s| s.id.clone()).collect();
        let mut ids = UuidIds;

        let added = catalog.bulk_import(
            vec![ImportedSubject {
                name: "Lý".to_string(),
                icon: None,
                modules: vec![ImportedModule {
                    name: None,
                    lessons: vec![ImportedLesson {
                        name: "L1".to_string(),
                        url: None,
                    }],
                }],
            }],
            &mut ids,
        );

        assert_eq!(added.len(), 1);
        assert!(!existing.contains(&added[0]));
        let subject = catalog.subject(&added[0]).unwrap();
        assert_eq!(subject.icon, IMPORTED_SUBJECT_ICON);
        assert_eq!(subject.modules[0].name, IMPORTED_MODULE_NAME);
        assert_eq!(subject.modules[0].lessons[0].name, "L1");
        assert_eq!(subject.modules[0].lessons[0].url, "");
    }

    #[test]
    fn test_bulk_import_twice_duplicates_by_name() {
        let mut catalog = Catalog::new();
        let mut ids = SequentialIds::new();
        let payload = vec![ImportedSubject {
            name: "Hóa".to_string(),
            icon: Some("fa-flask".to_string()),
            modules: vec![],
        }];
        let first = catalog.bulk_import(payload.clone(), &mut ids);
        let second = catalog.bulk_import(payload, &mut ids);
        assert_eq!(catalog.len(), 2);
        assert_ne!(first[0], second[0]);
        assert!(catalog.subjects().iter().all(|s| s.name == "Hóa" && s.icon == "fa-flask"));
    }

    #[test]
    fn test_seed_has_two_subjects_with_one_empty_module() {
        let catalog = Catalog::seed();
        assert_eq!(catalog.len(), 2);
        for subject in catalog.subjects() {
            assert_eq!(subject.modules.len(), 1);
            assert!(subject.modules[0].lessons.is_empty());
        }
    }
}
