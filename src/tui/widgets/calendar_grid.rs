use chrono::{Datelike, NaiveDate};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use crate::calendar::{MonthCursor, WEEKDAY_HEADERS, day_summary, month_grid};
use crate::models::DailyTasks;
use crate::search::SearchQuery;
use crate::tui::widgets::color::Palette;

/// Everything the month grid needs for one frame
pub struct CalendarGrid<'a> {
    pub month: MonthCursor,
    pub cursor: NaiveDate,
    pub selected: Option<NaiveDate>,
    pub today: NaiveDate,
    pub tasks: &'a DailyTasks,
    pub query: &'a SearchQuery,
    pub focused: bool,
}

pub fn render_calendar_grid(f: &mut Frame, area: Rect, grid: &CalendarGrid<'_>, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", grid.month.title()))
        .border_style(palette.border(grid.focused))
        .style(palette.base());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cells = month_grid(grid.month);
    let weeks: Vec<&[Option<NaiveDate>]> = cells.chunks(7).collect();
    let week_count = u16::try_from(weeks.len()).unwrap_or(u16::MAX).max(1);
    let row_height = (inner.height.saturating_sub(1) / week_count).max(1);
    let cell_width = usize::from(inner.width / 7).saturating_sub(1);

    let header = Row::new(WEEKDAY_HEADERS.iter().map(|h| Cell::from(*h)))
        .style(palette.muted().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = weeks
        .iter()
        .map(|week| {
            let mut cells: Vec<Cell> = week
                .iter()
                .map(|date| match date {
                    Some(date) => day_cell(*date, grid, row_height, cell_width, palette),
                    None => Cell::from(""),
                })
                .collect();
            // Trailing cells of the last week are not in the grid
            cells.resize_with(7, || Cell::from(""));
            Row::new(cells).height(row_height)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Ratio(1, 7); 7])
        .header(header)
        .column_spacing(0)
        .style(palette.base());
    f.render_widget(table, inner);
}

fn day_cell(
    date: NaiveDate,
    grid: &CalendarGrid<'_>,
    row_height: u16,
    cell_width: usize,
    palette: &Palette,
) -> Cell<'static> {
    let summary = day_summary(grid.tasks, date, grid.query);
    let marker = if summary.has_incomplete {
        " •"
    } else if !summary.tasks.is_empty() {
        " ✓"
    } else {
        ""
    };

    let mut lines = vec![Line::from(format!("{:>2}{}", date.day(), marker))];
    let title_rows = usize::from(row_height.saturating_sub(1));
    if title_rows > 0 && !summary.tasks.is_empty() {
        let overflow = summary.tasks.len() > title_rows;
        let shown = if overflow { title_rows - 1 } else { summary.tasks.len() };
        for task in summary.tasks.iter().take(shown) {
            let title: String = task.title.chars().take(cell_width).collect();
            let style = if task.completed { palette.muted() } else { palette.base() };
            lines.push(Line::styled(title, style));
        }
        if overflow {
            let rest = summary.tasks.len() - shown;
            let suffix = if grid.query.is_empty() { "" } else { " khớp" };
            lines.push(Line::styled(format!("+ {} việc{}", rest, suffix), palette.muted()));
        }
    }

    let mut style = palette.base();
    if summary.has_incomplete && date < grid.today {
        style = palette.warning();
    }
    if date == grid.today {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    if Some(date) == grid.selected {
        style = style.fg(palette.highlight_bg).add_modifier(Modifier::BOLD);
    }
    if date == grid.cursor && grid.focused {
        style = palette.highlight();
    }
    Cell::from(Text::from(lines)).style(style)
}
