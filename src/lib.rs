pub mod calendar;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod ids;
pub mod models;
pub mod outline;
pub mod planner;
pub mod search;
pub mod selection;
pub mod store;
pub mod tasks;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use models::{Catalog, DailyTasks, LearningModule, Lesson, Subject, Task, View};
pub use planner::{Planner, PlannerError};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use utils::Profile;
