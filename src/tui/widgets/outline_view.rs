use ratatui::widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout as RatLayout, Rect};
use ratatui::text::{Line, Span, Text};
use ratskin::RatSkin;
use termimad::minimad::Text as MinimadText;
use std::cmp;
use crate::tui::app::OutlineState;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::help::popup_area;

/// Render Markdown into styled lines wrapped at `width`
pub fn markdown_lines(markdown: &str, width: u16) -> Vec<Line<'static>> {
    RatSkin::default()
        .parse(MinimadText::from(markdown), width)
        .into_iter()
        .map(|line| {
            let spans: Vec<Span> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Popup showing the drafted lesson outline, scrollable
pub fn render_outline_view(f: &mut Frame, area: Rect, outline: &mut OutlineState, palette: &Palette) {
    let popup_area = popup_area(area, 70, 80);
    f.render_widget(Clear, popup_area);

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(popup_area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Dàn ý: {} ", outline.title))
        .title_alignment(Alignment::Center)
        .border_style(palette.border(true))
        .style(palette.base());

    let Some(content) = outline.content.as_deref() else {
        let paragraph = Paragraph::new("Đang soạn dàn ý...")
            .block(block)
            .style(palette.muted());
        f.render_widget(paragraph, content_area);
        return;
    };

    let viewport_height = content_area.height.saturating_sub(2) as usize;
    let lines = markdown_lines(content, content_area.width.saturating_sub(2));
    let total_lines = lines.len();

    // Clamp so scrolling past the end does not leave an empty popup
    let max_scroll = total_lines.saturating_sub(viewport_height);
    outline.scroll = cmp::min(outline.scroll, max_scroll);
    let end_line = cmp::min(outline.scroll + viewport_height, total_lines);
    let visible = Text::from(lines[outline.scroll..end_line].to_vec());

    // trim: false preserves indentation of nested lists
    let paragraph = Paragraph::new(visible)
        .block(block)
        .style(palette.base())
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(outline.scroll);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}
