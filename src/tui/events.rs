use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::{Duration, Instant};
use crate::config::KeyBindings;
use crate::models::View;
use crate::tui::app::{App, Focus, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::editor::Editor;
use crate::utils::{has_primary_modifier, parse_key_binding};

/// Guard that ensures terminal state is restored even on panic
/// If the terminal is left in raw mode or alternate screen, the user's
/// terminal will be unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore terminal state on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Ignore errors in drop - we're already in a cleanup path
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check terminal size before entering alternate screen so the error shows in the normal terminal
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;

    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    tracing::debug!(width, height, "terminal ready");

    loop {
        app.check_status_message_timeout();
        app.poll_jobs();
        app.clamp_selection();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect, app.config.sidebar_width_percent);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Only Press events; Release events would double-process keys on Windows
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, key_event)? {
                        break;
                    }
                }
                Event::Paste(text) => handle_paste(&mut app, &text),
                _ => {}
            }
        }
    }

    if app.planner.is_importing() {
        tracing::warn!("quitting while an import is still running; its result is discarded");
    }
    guard.restore()?;
    Ok(())
}

/// Returns `true` when the app should quit
fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    // Clone so handlers can borrow the app mutably while checking bindings
    let kb = app.config.key_bindings.clone();
    match app.ui.mode {
        Mode::Help => handle_help_mode(app, key_event, &kb),
        Mode::Search => handle_search_mode(app, key_event),
        Mode::Input => handle_input_mode(app, key_event),
        Mode::Import => handle_import_mode(app, key_event, &kb),
        Mode::Outline => handle_outline_mode(app, key_event, &kb),
        Mode::View => handle_view_mode(app, key_event, &kb),
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.ui.mode {
        Mode::Import => app.import_editor.insert_str(text),
        Mode::Input => {
            if let Some(editor) = app.input.as_mut().and_then(|form| form.current_editor_mut()) {
                editor.insert_str(text);
            }
        }
        Mode::Search => {
            app.search_editor.insert_str(text);
            app.update_search();
        }
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || pressed(key_event, &kb.help)? {
        app.ui.mode = Mode::View;
    }
    // Ignore all other keys in help mode
    Ok(false)
}

fn handle_search_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Esc => app.exit_search_mode(false),
        KeyCode::Enter => app.exit_search_mode(true),
        _ => {
            if edit_text(&mut app.search_editor, key_event) {
                app.update_search();
            }
        }
    }
    Ok(false)
}

fn handle_input_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter => app.submit_input(),
        KeyCode::Tab => {
            if let Some(form) = app.input.as_mut() {
                form.next_field();
            }
        }
        KeyCode::BackTab => {
            if let Some(form) = app.input.as_mut() {
                form.previous_field();
            }
        }
        _ => {
            if let Some(editor) = app.input.as_mut().and_then(|form| form.current_editor_mut()) {
                edit_text(editor, key_event);
            }
        }
    }
    Ok(false)
}

fn handle_import_mode(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc {
        app.close_import();
    } else if pressed(key_event, &kb.submit)? {
        if app.planner.is_importing() {
            app.set_status_message("Đang phân tích dữ liệu...");
        } else {
            app.submit_import();
        }
    } else if pressed(key_event, &kb.paste)? {
        app.paste_into_import();
    } else {
        edit_text(&mut app.import_editor, key_event);
    }
    Ok(false)
}

fn handle_outline_mode(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || pressed(key_event, &kb.quit)? {
        app.close_outline();
    } else if key_event.code == KeyCode::Up || pressed(key_event, &kb.list_up)? {
        app.scroll_outline(false);
    } else if key_event.code == KeyCode::Down || pressed(key_event, &kb.list_down)? {
        app.scroll_outline(true);
    } else if pressed(key_event, &kb.select)? {
        app.copy_outline();
    }
    Ok(false)
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<bool, TuiError> {
    if pressed(key_event, &kb.quit)? {
        return Ok(true);
    }

    if pressed(key_event, &kb.help)? {
        app.ui.mode = Mode::Help;
    } else if pressed(key_event, &kb.search)? {
        app.enter_search_mode();
    } else if pressed(key_event, &kb.tab_1)? {
        app.switch_view(View::Calendar);
    } else if pressed(key_event, &kb.tab_2)? {
        app.switch_view(View::Lessons);
    } else if key_event.code == KeyCode::BackTab || pressed(key_event, &kb.switch_pane)? {
        app.cycle_focus();
    } else if pressed(key_event, &kb.cycle_theme)? {
        app.cycle_theme();
    } else if pressed(key_event, &kb.import)? {
        app.open_import();
    } else if key_event.code == KeyCode::Esc {
        app.delete_confirm.cancel();
        app.clear_status_message();
    } else {
        match app.planner.view() {
            View::Calendar => handle_calendar_keys(app, key_event, kb)?,
            View::Lessons => handle_lesson_keys(app, key_event, kb)?,
        }
    }
    Ok(false)
}

fn handle_calendar_keys(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<(), TuiError> {
    let on_grid = app.ui.focus == Focus::Grid;

    if pressed(key_event, &kb.prev_month)? {
        app.change_month(false);
    } else if pressed(key_event, &kb.next_month)? {
        app.change_month(true);
    } else if pressed(key_event, &kb.today)? {
        app.go_to_today();
    } else if pressed(key_event, &kb.backlog)? {
        app.start_add_backlog();
    } else if pressed(key_event, &kb.new)? {
        app.start_add();
    } else if pressed(key_event, &kb.toggle_task_status)? {
        app.toggle_selected_task();
    } else if pressed(key_event, &kb.delete)? {
        app.request_delete(Instant::now());
    } else if pressed(key_event, &kb.select)? {
        match app.ui.focus {
            Focus::Grid => {
                let cursor = app.ui.cursor;
                app.select_date(cursor);
                app.ui.focus = Focus::DayTasks;
            }
            Focus::Outstanding => app.open_outstanding_date(),
            _ => app.toggle_selected_task(),
        }
    } else if pressed(key_event, &kb.list_up)? {
        app.move_selection(false);
    } else if pressed(key_event, &kb.list_down)? {
        app.move_selection(true);
    } else {
        match key_event.code {
            KeyCode::Left if on_grid => app.move_cursor(-1),
            KeyCode::Right if on_grid => app.move_cursor(1),
            KeyCode::Up => app.move_selection(false),
            KeyCode::Down => app.move_selection(true),
            _ => {}
        }
    }
    Ok(())
}

fn handle_lesson_keys(app: &mut App, key_event: KeyEvent, kb: &KeyBindings) -> Result<(), TuiError> {
    if pressed(key_event, &kb.new)? {
        app.start_add();
    } else if pressed(key_event, &kb.new_module)? {
        app.start_add_module();
    } else if pressed(key_event, &kb.edit)? {
        app.start_edit();
    } else if pressed(key_event, &kb.delete)? {
        app.request_delete(Instant::now());
    } else if pressed(key_event, &kb.outline)? && app.ui.focus == Focus::Catalog {
        app.request_outline();
    } else if pressed(key_event, &kb.select)? {
        match app.ui.focus {
            Focus::Subjects => app.ui.focus = Focus::Catalog,
            _ => app.copy_selected_link(),
        }
    } else if key_event.code == KeyCode::Up || pressed(key_event, &kb.list_up)? {
        app.move_selection(false);
    } else if key_event.code == KeyCode::Down || pressed(key_event, &kb.list_down)? {
        app.move_selection(true);
    }
    Ok(())
}

/// Cursor movement and typing shared by every text field.
/// Returns `true` when the key changed or moved the editor.
fn edit_text(editor: &mut Editor, key_event: KeyEvent) -> bool {
    match key_event.code {
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
        KeyCode::Enter if editor.multi_line => editor.insert_newline(),
        KeyCode::Backspace => editor.delete_char(),
        KeyCode::Left => editor.move_cursor_left(),
        KeyCode::Right => editor.move_cursor_right(),
        KeyCode::Up => editor.move_cursor_up(),
        KeyCode::Down => editor.move_cursor_down(),
        KeyCode::Home => editor.move_cursor_home(),
        KeyCode::End => editor.move_cursor_end(),
        _ => return false,
    }
    true
}

fn pressed(key_event: KeyEvent, binding: &str) -> Result<bool, TuiError> {
    let parsed = parse_key_binding(binding).map_err(TuiError::KeyBindingError)?;
    Ok(matches_key_event(key_event, &parsed))
}

fn matches_key_event(key_event: KeyEvent, binding: &crate::utils::ParsedKeyBinding) -> bool {
    // Primary modifier is Ctrl on Windows/Linux, Option/Alt on macOS
    let has_primary_mod = has_primary_modifier(key_event.modifiers);
    if binding.requires_ctrl != has_primary_mod {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_ctrl_binding_needs_modifier() {
        assert!(!pressed(key(KeyCode::Char('s')), "Ctrl+s").unwrap());
        assert!(pressed(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), "Ctrl+s").unwrap());
        assert!(pressed(key(KeyCode::Char(' ')), "Space").unwrap());
    }

    #[test]
    fn test_edit_text_respects_single_line() {
        let mut editor = Editor::new();
        assert!(edit_text(&mut editor, key(KeyCode::Char('a'))));
        assert!(!edit_text(&mut editor, key(KeyCode::Enter)));
        assert!(!edit_text(&mut editor, KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL)));
        assert_eq!(editor.text(), "a");

        let mut editor = Editor::multi_line();
        edit_text(&mut editor, key(KeyCode::Enter));
        assert_eq!(editor.lines.len(), 2);
    }
}
