use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::Modifier;
use crate::config::KeyBindings;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::help::popup_area;
use crate::utils::format_key_binding_for_display as display;

/// Paste box for spreadsheet rows that the outline service turns into subjects
pub fn render_import_modal(
    f: &mut Frame,
    area: Rect,
    editor: &mut Editor,
    loading: bool,
    key_bindings: &KeyBindings,
    palette: &Palette,
) {
    let popup_area = popup_area(area, 70, 70);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Nhập dữ liệu AI · Tự động phân tích Sheet ")
        .title_alignment(Alignment::Center)
        .border_style(palette.border(true))
        .style(palette.base());
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let [hint_area, editor_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    f.render_widget(
        Paragraph::new("Dán nội dung từ Sheet tại đây (Môn, Học phần, Bài học, Link)").style(palette.muted()),
        hint_area,
    );

    let viewport_height = editor_area.height.saturating_sub(2) as usize;
    let viewport_width = editor_area.width.saturating_sub(2) as usize;
    editor.update_scroll(viewport_height, viewport_width);
    let text = editor.get_visible_lines(viewport_height, viewport_width).join("\n");
    f.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).border_style(palette.border(!loading)))
            .style(palette.base()),
        editor_area,
    );

    let footer = if loading {
        Paragraph::new("Đang phân tích dữ liệu...").style(palette.warning().add_modifier(Modifier::BOLD))
    } else {
        Paragraph::new(format!(
            "{}: Xác nhận nhập dữ liệu  {}: Dán  Esc: Đóng",
            display(&key_bindings.submit),
            display(&key_bindings.paste)
        ))
        .style(palette.muted())
    };
    f.render_widget(footer.alignment(Alignment::Center), footer_area);

    if !loading {
        if let Some(position) = editor.get_cursor_screen_pos(editor_area) {
            f.set_cursor_position(position);
        }
    }
}
