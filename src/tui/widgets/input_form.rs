use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use crate::tui::app::InputForm;
use crate::tui::widgets::color::Palette;

const FIELD_HEIGHT: u16 = 3;

/// Popup with one bordered single-line field per label
pub fn render_input_form(f: &mut Frame, area: Rect, form: &mut InputForm, palette: &Palette) {
    let field_count = u16::try_from(form.fields.len()).unwrap_or(1);
    let popup_area = fixed_height_popup(area, 60, field_count * FIELD_HEIGHT + 2);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", form.title))
        .title_alignment(Alignment::Center)
        .border_style(palette.border(true))
        .style(palette.base());
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let field_areas = Layout::vertical(vec![Constraint::Length(FIELD_HEIGHT); form.fields.len()]).split(inner);
    let current_field = form.current_field;

    for (i, (editor, label)) in form.fields.iter_mut().zip(&form.labels).enumerate() {
        let Some(&field_area) = field_areas.get(i) else {
            break;
        };
        let focused = i == current_field;
        let inner_width = field_area.width.saturating_sub(2) as usize;
        editor.update_scroll(1, inner_width);
        let text = editor.get_visible_lines(1, inner_width).join("");

        let paragraph = Paragraph::new(text)
            .block(Block::default()
                .borders(Borders::ALL)
                .title(*label)
                .border_style(palette.border(focused)))
            .style(palette.base());
        f.render_widget(paragraph, field_area);

        if focused {
            if let Some(position) = editor.get_cursor_screen_pos(field_area) {
                f.set_cursor_position(position);
            }
        }
    }
}

fn fixed_height_popup(area: Rect, percent_x: u16, height: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
