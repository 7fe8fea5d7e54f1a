use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use crate::search::SubjectView;
use crate::tui::widgets::PaneState;
use crate::tui::widgets::color::Palette;

/// Module and lesson tree of the selected subject. Rows are listed in the
/// same order as `App::catalog_rows`, so `pane.selected` indexes both.
pub fn render_catalog_view(
    f: &mut Frame,
    area: Rect,
    subject: Option<&SubjectView<'_>>,
    pane: &PaneState,
    palette: &Palette,
) {
    let Some(view) = subject else {
        let message = if pane.searching {
            "Không tìm thấy môn học nào khớp"
        } else {
            "Vui lòng chọn hoặc tạo môn học mới"
        };
        let paragraph = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title(" Giáo án ").border_style(palette.border(pane.focused)))
            .style(palette.muted())
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} · Hệ thống quản lý giáo án ", view.subject.name))
        .border_style(palette.border(pane.focused))
        .style(palette.base());

    if view.modules.is_empty() {
        let message = if view.has_no_visible_content() {
            "Không tìm thấy nội dung phù hợp trong môn học này"
        } else {
            "Chưa có học phần"
        };
        f.render_widget(Paragraph::new(message).block(block).style(palette.muted()).wrap(Wrap { trim: true }), area);
        return;
    }

    let max_width = area.width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = Vec::new();
    for module in &view.modules {
        let index = items.len();
        let name_style = if pane.armed == Some(index) {
            palette.warning()
        } else {
            palette.base().add_modifier(Modifier::BOLD)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("▸ {}", module.module.name), name_style),
            Span::styled(format!(" ({} bài)", module.module.lessons.len()), palette.muted()),
        ])));

        for lesson in &module.lessons {
            let index = items.len();
            let name_style = if pane.armed == Some(index) { palette.warning() } else { palette.base() };
            let link = match lesson.url() {
                Some(url) => Span::styled(format!("  {}", url), palette.muted()),
                None => Span::styled(
                    "  Chưa gắn link giáo án",
                    palette.muted().add_modifier(Modifier::ITALIC),
                ),
            };
            let name: String = lesson.name.chars().take(max_width.saturating_sub(4)).collect();
            items.push(ListItem::new(Line::from(vec![
                Span::styled(format!("    {}", name), name_style),
                link,
            ])));
        }
    }

    let list = List::new(items)
        .block(block)
        .style(palette.base())
        .highlight_style(if pane.focused { palette.highlight() } else { palette.base() })
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(pane.selected);
    f.render_stateful_widget(list, area, &mut state);
}
