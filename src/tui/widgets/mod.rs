pub mod calendar_grid;
pub mod catalog_view;
pub mod color;
pub mod editor;
pub mod help;
pub mod import_modal;
pub mod input_form;
pub mod outline_view;
pub mod status_bar;
pub mod subject_list;
pub mod tabs;
pub mod task_list;

/// Per-frame state of a list pane
#[derive(Debug, Clone, Copy, Default)]
pub struct PaneState {
    pub selected: Option<usize>,
    /// Row armed for deletion, if any
    pub armed: Option<usize>,
    pub focused: bool,
    pub searching: bool,
}
