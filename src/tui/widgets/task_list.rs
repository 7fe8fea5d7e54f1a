use chrono::NaiveDate;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use crate::models::Task;
use crate::tasks::Outstanding;
use crate::tui::widgets::PaneState;
use crate::tui::widgets::color::Palette;

fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

fn status_indicator(task: &Task) -> &'static str {
    if task.completed { "✓" } else { "○" }
}

pub fn render_day_tasks(
    f: &mut Frame,
    area: Rect,
    date: Option<NaiveDate>,
    tasks: &[&Task],
    pane: &PaneState,
    palette: &Palette,
) {
    let Some(date) = date else {
        let paragraph = Paragraph::new("Chọn ngày trên lịch để xem việc cụ thể.")
            .block(Block::default().borders(Borders::ALL).title(" Chọn một ngày ").border_style(palette.border(pane.focused)))
            .style(palette.muted())
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    };

    let suffix = if pane.searching { "khớp tìm kiếm" } else { "đã lên lịch" };
    let title = format!(" {} · {} việc {} ", date.format("%d/%m/%Y"), tasks.len(), suffix);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(palette.border(pane.focused))
        .style(palette.base());

    if tasks.is_empty() {
        let message = if pane.searching { "Không có nội dung phù hợp" } else { "Chưa có việc nào" };
        f.render_widget(Paragraph::new(message).block(block).style(palette.muted()), area);
        return;
    }

    // 2 for borders, 2 for the indicator
    let max_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let text = truncate(&format!("{} {}", status_indicator(task), task.title), max_width);
            let style = if pane.armed == Some(i) {
                palette.warning()
            } else if task.completed {
                palette.muted()
            } else {
                palette.base()
            };
            ListItem::new(Line::styled(text, style))
        })
        .collect();

    render_list(f, area, items, block, pane, palette);
}

pub fn render_outstanding(
    f: &mut Frame,
    area: Rect,
    outstanding: &Outstanding<'_>,
    pane: &PaneState,
    palette: &Palette,
) {
    let heading = if pane.searching { "Kết quả tìm kiếm" } else { "Việc tồn đọng" };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ({}) ", heading, outstanding.len()))
        .border_style(palette.border(pane.focused))
        .style(palette.base());

    if outstanding.is_empty() {
        let message = if pane.searching {
            "Không tìm thấy kết quả phù hợp"
        } else {
            "Tuyệt vời! Không còn việc tồn đọng."
        };
        f.render_widget(Paragraph::new(message).block(block).style(palette.muted()).wrap(Wrap { trim: true }), area);
        return;
    }

    let max_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = outstanding
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry.label();
            let title_width = max_width.saturating_sub(label.chars().count() + 3);
            let title = truncate(&format!("{} {}", status_indicator(entry.task), entry.task.title), title_width);
            let label_style = if entry.is_backlog() { palette.muted() } else { palette.warning() };
            let title_style = if pane.armed == Some(i) { palette.warning() } else { palette.base() };
            ListItem::new(Line::from(vec![
                Span::styled(title, title_style),
                Span::raw("  "),
                Span::styled(label, label_style),
            ]))
        })
        .collect();

    render_list(f, area, items, block, pane, palette);
}

fn render_list(
    f: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    block: Block,
    pane: &PaneState,
    palette: &Palette,
) {
    let highlight = if pane.focused { palette.highlight() } else { palette.base() };
    let list = List::new(items)
        .block(block)
        .style(palette.base())
        .highlight_style(highlight)
        .highlight_symbol(if pane.focused { "> " } else { "  " });
    let mut state = ListState::default().with_selected(pane.selected);
    f.render_stateful_widget(list, area, &mut state);
}
