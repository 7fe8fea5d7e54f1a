use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::cmp;
use std::time::Instant;
use crate::models::View;
use crate::tui::{App, Layout};
use crate::tui::app::{CatalogRow, DeleteTarget, Focus, Mode};
use crate::tui::widgets::{
    PaneState,
    calendar_grid::{CalendarGrid, render_calendar_grid},
    catalog_view::render_catalog_view,
    color::Palette,
    help::render_help,
    import_modal::render_import_modal,
    input_form::render_input_form,
    outline_view::render_outline_view,
    status_bar::render_status_bar,
    subject_list::render_subject_list,
    tabs::render_tabs,
    task_list::{render_day_tasks, render_outstanding},
};

const SEARCH_PREFIX: &str = "Tìm: ";

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let palette = Palette::from_theme(&app.config.get_active_theme());

    let title = if app.planner.search().is_empty() {
        " EduPlan ".to_string()
    } else {
        format!(" EduPlan · {}{} ", SEARCH_PREFIX, app.planner.search_text())
    };
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(palette.base());
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.planner.view(), &palette);

    match app.planner.view() {
        View::Calendar => render_calendar(f, app, layout, &palette),
        View::Lessons => render_lessons(f, app, layout, &palette),
    }

    if app.ui.mode == Mode::Search {
        render_search_line(f, layout.status_area, app, &palette);
    } else {
        let hints = app.key_hints();
        render_status_bar(f, layout.status_area, app.status.message.as_deref(), &hints, &palette);
    }

    // Popups render last so they sit on top of the panes
    match app.ui.mode {
        Mode::Help => render_help(f, layout.inner_area, &app.config.key_bindings, &palette),
        Mode::Input => {
            if let Some(form) = app.input.as_mut() {
                render_input_form(f, layout.inner_area, form, &palette);
            }
        }
        Mode::Import => {
            let loading = app.planner.is_importing();
            render_import_modal(
                f,
                layout.inner_area,
                &mut app.import_editor,
                loading,
                &app.config.key_bindings,
                &palette,
            );
        }
        Mode::Outline => {
            if let Some(outline) = app.outline.as_mut() {
                render_outline_view(f, layout.inner_area, outline, &palette);
            }
        }
        Mode::View | Mode::Search => {}
    }
}

fn render_calendar(f: &mut Frame, app: &App, layout: &Layout, palette: &Palette) {
    let panes = layout.calendar_panes();
    let searching = !app.planner.search().is_empty();
    let armed = app.delete_confirm.armed(Instant::now());

    let grid = CalendarGrid {
        month: app.ui.month,
        cursor: app.ui.cursor,
        selected: app.planner.selected_date(),
        today: app.today,
        tasks: app.planner.tasks(),
        query: app.planner.search(),
        focused: app.ui.focus == Focus::Grid,
    };
    render_calendar_grid(f, panes.grid, &grid, palette);

    let day_key = app.selected_date_key();
    let day_tasks = app.day_tasks();
    let day_armed = match armed {
        Some(DeleteTarget::Task { date_key, task_id }) if Some(date_key) == day_key.as_ref() => {
            day_tasks.iter().position(|t| &t.id == task_id)
        }
        _ => None,
    };
    let day_pane = PaneState {
        selected: (!day_tasks.is_empty()).then_some(app.ui.day_index),
        armed: day_armed,
        focused: app.ui.focus == Focus::DayTasks,
        searching,
    };
    render_day_tasks(f, panes.day_tasks, app.planner.selected_date(), &day_tasks, &day_pane, palette);

    let outstanding = app.planner.outstanding(app.today);
    let outstanding_armed = match armed {
        Some(DeleteTarget::Task { date_key, task_id }) => outstanding
            .iter()
            .position(|e| e.date_key == date_key.as_str() && &e.task.id == task_id),
        _ => None,
    };
    let outstanding_pane = PaneState {
        selected: (!outstanding.is_empty()).then_some(app.ui.outstanding_index),
        armed: outstanding_armed,
        focused: app.ui.focus == Focus::Outstanding,
        searching,
    };
    render_outstanding(f, panes.outstanding, &outstanding, &outstanding_pane, palette);
}

fn render_lessons(f: &mut Frame, app: &App, layout: &Layout, palette: &Palette) {
    let searching = !app.planner.search().is_empty();
    let armed = app.delete_confirm.armed(Instant::now());

    let visible = app.planner.visible_subjects();
    let subject_armed = match armed {
        Some(DeleteTarget::Subject { subject_id }) => visible.iter().position(|v| v.id() == subject_id),
        _ => None,
    };
    let subject_pane = PaneState {
        selected: app.subject_index(),
        armed: subject_armed,
        focused: app.ui.focus == Focus::Subjects,
        searching,
    };
    render_subject_list(f, layout.sidebar_area, &visible, &subject_pane, palette);

    let rows = app.catalog_rows();
    let row_armed = match armed {
        Some(DeleteTarget::Module { module_id, .. }) => rows
            .iter()
            .position(|r| matches!(r, CatalogRow::Module { module_id: m } if m == module_id)),
        Some(DeleteTarget::Lesson { lesson_id, .. }) => rows
            .iter()
            .position(|r| matches!(r, CatalogRow::Lesson { lesson_id: l, .. } if l == lesson_id)),
        _ => None,
    };
    let catalog_pane = PaneState {
        selected: (!rows.is_empty()).then_some(app.ui.catalog_index),
        armed: row_armed,
        focused: app.ui.focus == Focus::Catalog,
        searching,
    };
    let current = app.planner.current_subject();
    render_catalog_view(f, layout.main_area, current.as_ref(), &catalog_pane, palette);
}

fn render_search_line(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let prefix_width = SEARCH_PREFIX.chars().count();
    let available = (area.width as usize).saturating_sub(prefix_width + 1);
    let editor = &app.search_editor;
    let skip = editor.cursor_col.saturating_sub(available);
    let shown: String = editor.text().chars().skip(skip).take(available).collect();

    f.render_widget(
        Paragraph::new(format!("{}{}", SEARCH_PREFIX, shown)).style(palette.highlight()),
        area,
    );

    let column = cmp::min(prefix_width + editor.cursor_col - skip, area.width.saturating_sub(1) as usize);
    f.set_cursor_position((area.x + column as u16, area.y));
}
