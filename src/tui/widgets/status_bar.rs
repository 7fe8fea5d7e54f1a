use ratatui::widgets::Paragraph;
use ratatui::Frame;
use ratatui::layout::Rect;
use crate::tui::widgets::color::Palette;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&str>,
    key_hints: &[String],
    palette: &Palette,
) {
    let max_width = area.width as usize;
    let (content, style) = match message {
        // Status messages get a highlighted background for visibility
        Some(msg) => (truncate(msg, max_width), palette.highlight()),
        None => (fit_hints(key_hints, max_width), palette.base()),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Join as many hints as fit, ending with an ellipsis when some were dropped
fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let separator_len = SEPARATOR.chars().count();
    let mut hints_text = String::new();

    for (i, hint) in key_hints.iter().enumerate() {
        let current_len = hints_text.chars().count();
        let would_be_len = if i == 0 {
            hint.chars().count()
        } else {
            current_len + separator_len + hint.chars().count()
        };

        if would_be_len > max_width {
            if i == 0 {
                return truncate(hint, max_width);
            }
            if current_len + ELLIPSIS.len() > max_width {
                hints_text = hints_text
                    .chars()
                    .take(max_width.saturating_sub(ELLIPSIS.len()))
                    .collect();
            }
            hints_text.push_str(ELLIPSIS);
            break;
        }

        if i > 0 {
            hints_text.push_str(SEPARATOR);
        }
        hints_text.push_str(hint);
    }
    hints_text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_hints_drops_what_does_not_fit() {
        let hints = vec!["n: Thêm".to_string(), "d: Xóa".to_string(), "q: Thoát".to_string()];
        assert_eq!(fit_hints(&hints, 80), "n: Thêm • d: Xóa • q: Thoát");
        assert_eq!(fit_hints(&hints, 20), "n: Thêm • d: Xóa...");
        assert_eq!(fit_hints(&hints, 5), "n:...");
    }
}
