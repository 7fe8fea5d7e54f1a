use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use crate::search::SubjectView;
use crate::tui::widgets::PaneState;
use crate::tui::widgets::color::Palette;

pub fn render_subject_list(
    f: &mut Frame,
    area: Rect,
    subjects: &[SubjectView<'_>],
    pane: &PaneState,
    palette: &Palette,
) {
    let title = if pane.searching {
        format!(" Kết quả ({}) ", subjects.len())
    } else {
        " Danh mục môn ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(palette.border(pane.focused))
        .style(palette.base());

    if subjects.is_empty() {
        let message = if pane.searching { "Không thấy môn phù hợp" } else { "Chưa có môn học" };
        f.render_widget(Paragraph::new(message).block(block).style(palette.muted()), area);
        return;
    }

    let items: Vec<ListItem> = subjects
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let name_style = if pane.armed == Some(i) { palette.warning() } else { palette.base() };
            ListItem::new(Line::from(vec![
                Span::styled(view.subject.name.clone(), name_style),
                Span::styled(format!(" ({})", view.subject.lesson_count()), palette.muted()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .style(palette.base())
        .highlight_style(if pane.focused { palette.highlight() } else { palette.base() })
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(pane.selected);
    f.render_stateful_widget(list, area, &mut state);
}
