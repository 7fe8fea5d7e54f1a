use ratatui::style::{Color, Modifier, Style};

use crate::config::Theme;

/// Parse a color string into a ratatui Color
/// Supports named colors (basic and `light*`/`dark*` variants), `#RRGGBB`, `#RGB`
/// and `rgb(r, g, b)`. Unrecognized input falls back to white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();
    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => parse_hex_color(&s)
            .or_else(|| parse_rgb_color(&s))
            .unwrap_or(Color::White),
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        // #RGB doubles each digit
        3 => Some(Color::Rgb(channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17)),
        _ => None,
    }
}

fn parse_rgb_color(s: &str) -> Option<Color> {
    let inner = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<u8> = inner
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
        _ => None,
    }
}

/// Format a Color back to the string form accepted by [`parse_color`]
pub fn format_color_for_display(color: &Color) -> String {
    match color {
        Color::Black => "black".to_string(),
        Color::Red => "red".to_string(),
        Color::Green => "green".to_string(),
        Color::Yellow => "yellow".to_string(),
        Color::Blue => "blue".to_string(),
        Color::Magenta => "magenta".to_string(),
        Color::Cyan => "cyan".to_string(),
        Color::Gray => "gray".to_string(),
        Color::DarkGray => "darkgray".to_string(),
        Color::LightRed => "lightred".to_string(),
        Color::LightGreen => "lightgreen".to_string(),
        Color::LightYellow => "lightyellow".to_string(),
        Color::LightBlue => "lightblue".to_string(),
        Color::LightMagenta => "lightmagenta".to_string(),
        Color::LightCyan => "lightcyan".to_string(),
        Color::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        _ => "white".to_string(),
    }
}

/// Black text on light backgrounds, white on dark ones
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => {
            let luminance = 0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b);
            luminance < 128.0
        }
        Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray => true,
        _ => false,
    };
    if dark { Color::White } else { Color::Black }
}

/// Resolved colors of the active theme, computed once per frame
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub tab_bg: Color,
    pub warning: Color,
}

impl Palette {
    pub fn from_theme(theme: &Theme) -> Self {
        let highlight_bg = parse_color(&theme.highlight_bg);
        let highlight_fg = if theme.highlight_fg.is_empty() {
            get_contrast_text_color(highlight_bg)
        } else {
            parse_color(&theme.highlight_fg)
        };
        Self {
            fg: parse_color(&theme.fg),
            bg: parse_color(&theme.bg),
            highlight_bg,
            highlight_fg,
            tab_bg: parse_color(&theme.tab_bg),
            warning: parse_color(&theme.warning),
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning).bg(self.bg)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(Color::DarkGray).bg(self.bg)
    }

    /// Border style for a pane, brighter when it has focus
    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.highlight_bg).bg(self.bg)
        } else {
            self.base()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_formats() {
        assert_eq!(parse_color(" Blue "), Color::Blue);
        assert_eq!(parse_color("#ff0080"), Color::Rgb(255, 0, 128));
        assert_eq!(parse_color("#f08"), Color::Rgb(255, 0, 136));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Color::Rgb(1, 2, 3));
        assert_eq!(parse_color("not-a-color"), Color::White);
    }

    #[test]
    fn test_contrast_text_color() {
        assert_eq!(get_contrast_text_color(Color::Blue), Color::White);
        assert_eq!(get_contrast_text_color(Color::Yellow), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(250, 250, 250)), Color::Black);
    }

    #[test]
    fn test_palette_computes_missing_highlight_fg() {
        let theme = Theme {
            highlight_bg: "yellow".to_string(),
            highlight_fg: String::new(),
            ..Theme::default()
        };
        assert_eq!(Palette::from_theme(&theme).highlight_fg, Color::Black);
    }
}
