use uuid::Uuid;

/// Kind of entity an identifier is minted for; selects the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Subject,
    Module,
    Lesson,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Task => "t",
            EntityKind::Subject => "s",
            EntityKind::Module => "m",
            EntityKind::Lesson => "l",
        }
    }
}

/// Source of fresh identifiers for new entities
pub trait IdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String;

    /// Draw ids until one is not rejected by `taken`.
    ///
    /// Sibling lists must never hold two entries with the same id, so callers
    /// pass a predicate over the ids already present in the parent list.
    fn unique_id(&mut self, kind: EntityKind, taken: &dyn Fn(&str) -> bool) -> String {
        loop {
            let id = self.next_id(kind);
            if !taken(&id) {
                return id;
            }
            tracing::warn!(id = %id, "generated id collided with a sibling, drawing again");
        }
    }
}

/// Random UUID v4 identifiers, e.g. `s-3f2c...`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self, kind: EntityKind) -> String {
        format!("{}-{}", kind.prefix(), Uuid::new_v4().simple())
    }
}

/// Monotonic counter identifiers (`t-1`, `s-2`, ...), deterministic for tests and scripted runs
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: EntityKind) -> String {
        self.next += 1;
        format!("{}-{}", kind.prefix(), self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_carry_prefix_and_differ() {
        let mut ids = UuidIds;
        let a = ids.next_id(EntityKind::Subject);
        let b = ids.next_id(EntityKind::Subject);
        assert!(a.starts_with("s-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_uuid_ids_unique_over_bulk_draw() {
        let mut ids = UuidIds;
        let drawn: HashSet<String> = (0..1000).map(|_| ids.next_id(EntityKind::Lesson)).collect();
        assert_eq!(drawn.len(), 1000);
    }

    #[test]
    fn test_sequential_ids_are_monotonic() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id(EntityKind::Task), "t-1");
        assert_eq!(ids.next_id(EntityKind::Module), "m-2");
    }

    #[test]
    fn test_unique_id_skips_taken_values() {
        let mut ids = SequentialIds::new();
        let taken = |id: &str| id == "l-1" || id == "l-2";
        assert_eq!(ids.unique_id(EntityKind::Lesson, &taken), "l-3");
    }
}
