use ratatui::layout::{Rect, Layout as RatLayout, Direction, Constraint};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub tabs_area: Rect,
    pub sidebar_area: Rect,
    pub main_area: Rect,
    pub status_area: Rect,
}

/// Panes of the calendar view
pub struct CalendarPanes {
    pub grid: Rect,
    pub day_tasks: Rect,
    pub outstanding: Rect,
}

impl Layout {
    /// Minimum terminal dimensions required for the application.
    /// Width fits seven 6-column day cells plus the task panes; height fits six
    /// grid rows with a header, tabs, and status line.
    pub const MIN_WIDTH: u16 = 60;
    pub const MIN_HEIGHT: u16 = 16;

    /// `sidebar_width_percent` sizes the subject list in the lessons view and
    /// the task column in the calendar view
    pub fn calculate(size: Rect, sidebar_width_percent: u16) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        // 1 char of outer border on each side
        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        // min 25 chars, max 40%, and the main area keeps at least 20
        let percent_of = |p: u16| (u32::from(inner_area.width) * u32::from(p) / 100) as u16;
        let requested_width = percent_of(sidebar_width_percent);
        let max_width = percent_of(40);
        let sidebar_width = requested_width
            .max(25)
            .min(max_width)
            .min(inner_area.width.saturating_sub(20));

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Tabs
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        let horizontal = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(sidebar_width), Constraint::Min(1)])
            .split(vertical[1]);

        Self {
            inner_area,
            tabs_area: vertical[0],
            sidebar_area: horizontal[0],
            main_area: horizontal[1],
            status_area: vertical[2],
        }
    }

    /// Month grid on the left, selected day over the outstanding list on the right
    pub fn calendar_panes(&self) -> CalendarPanes {
        let content = Rect::new(
            self.sidebar_area.x,
            self.sidebar_area.y,
            self.sidebar_area.width + self.main_area.width,
            self.sidebar_area.height,
        );
        let columns = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(self.sidebar_area.width),
            ])
            .split(content);
        let rows = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        CalendarPanes {
            grid: columns[0],
            day_tasks: rows[0],
            outstanding: rows[1],
        }
    }
}
