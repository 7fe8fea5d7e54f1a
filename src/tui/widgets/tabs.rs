use ratatui::widgets::Tabs;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::models::View;
use crate::tui::widgets::color::{get_contrast_text_color, Palette};

const TAB_TITLES: [&str; 2] = ["Công việc trong tháng", "Giáo án"];

pub fn render_tabs(f: &mut Frame, area: Rect, current_view: View, palette: &Palette) {
    // Contrast-aware text keeps unselected tabs readable on any tab_bg
    let tab_fg = get_contrast_text_color(palette.tab_bg);

    // Background padding on both sides makes each tab look like a box
    let titles: Vec<Line> = TAB_TITLES
        .iter()
        .enumerate()
        .map(|(i, title)| {
            Line::from(vec![
                Span::styled("  ", Style::default().bg(palette.tab_bg)),
                Span::styled(format!("{} {}", i + 1, title), Style::default().fg(tab_fg).bg(palette.tab_bg)),
                Span::styled("  ", Style::default().bg(palette.tab_bg)),
            ])
        })
        .collect();

    let tab_index = match current_view {
        View::Calendar => 0,
        View::Lessons => 1,
    };

    let tabs = Tabs::new(titles)
        .select(tab_index)
        .style(palette.base())
        .highlight_style(palette.highlight())
        .divider("  ")
        .padding("", "");

    f.render_widget(tabs, area);
}
