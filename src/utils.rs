use chrono::{Datelike, Local, NaiveDate};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "eduplan-dev",
            Profile::Prod => "eduplan",
        }
    }
}

/// Get the configuration directory path for eduplan
/// If profile is Dev, uses "eduplan-dev" instead of "eduplan"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "eduplan", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for eduplan (database and log file live here)
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "eduplan", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Format a calendar date as a task bucket key: `YYYY-M-D`, no zero padding
pub fn date_key(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Parse a bucket key back into a calendar date.
/// Zero-padded input (`2024-05-10`) is accepted too; `backlog` and garbage yield `None`.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    let mut parts = key.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parsed key binding information
#[derive(Debug, Clone)]
pub struct ParsedKeyBinding {
    pub key_code: crossterm::event::KeyCode,
    pub requires_ctrl: bool,
}

/// Check if a key event has the primary modifier (Ctrl on Windows/Linux, Option/Alt on macOS)
pub fn has_primary_modifier(modifiers: crossterm::event::KeyModifiers) -> bool {
    #[cfg(target_os = "macos")]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
            || modifiers.contains(crossterm::event::KeyModifiers::ALT)
    }

    #[cfg(not(target_os = "macos"))]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
    }
}

/// Format a key binding string for display, showing the platform-appropriate modifier
/// On macOS, "Ctrl+" is replaced with "Opt+"
pub fn format_key_binding_for_display(key_binding: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        key_binding.replace("Ctrl+", "Opt+")
    }

    #[cfg(not(target_os = "macos"))]
    {
        key_binding.to_string()
    }
}

/// Parse a key binding string from config into a ParsedKeyBinding
/// Supports: single keys ("q", "n"), special keys ("Enter", "Left"), and "Ctrl+" modifiers
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();

    if let Some(key_part) = key_str.strip_prefix("Ctrl+") {
        let key_code = parse_key_code(key_part)?;
        return Ok(ParsedKeyBinding {
            key_code,
            requires_ctrl: true,
        });
    }

    let key_code = parse_key_code(key_str)?;
    Ok(ParsedKeyBinding {
        key_code,
        requires_ctrl: false,
    })
}

/// Parse a key code from a string (without modifiers)
fn parse_key_code(key_str: &str) -> Result<crossterm::event::KeyCode, String> {
    use crossterm::event::KeyCode;

    match key_str {
        "Enter" => Ok(KeyCode::Enter),
        "Esc" | "Escape" => Ok(KeyCode::Esc),
        "Backspace" => Ok(KeyCode::Backspace),
        "Tab" => Ok(KeyCode::Tab),
        "Space" | " " => Ok(KeyCode::Char(' ')),
        "Left" => Ok(KeyCode::Left),
        "Right" => Ok(KeyCode::Right),
        "Up" => Ok(KeyCode::Up),
        "Down" => Ok(KeyCode::Down),
        "Home" => Ok(KeyCode::Home),
        "End" => Ok(KeyCode::End),
        "PageUp" => Ok(KeyCode::PageUp),
        "PageDown" => Ok(KeyCode::PageDown),
        "Delete" => Ok(KeyCode::Delete),
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KeyCode::Char(c)),
                _ => Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    #[test]
    fn test_date_key_has_no_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!(date_key(date), "2024-5-9");
    }

    #[test]
    fn test_parse_date_key_accepts_padded_and_unpadded() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 10);
        assert_eq!(parse_date_key("2024-5-10"), expected);
        assert_eq!(parse_date_key("2024-05-10"), expected);
    }

    #[test]
    fn test_parse_date_key_rejects_backlog_and_invalid_days() {
        assert_eq!(parse_date_key("backlog"), None);
        assert_eq!(parse_date_key("2024-2-30"), None);
        assert_eq!(parse_date_key("2024-5"), None);
    }

    #[test]
    fn test_parse_key_binding_variants() {
        let ctrl = parse_key_binding("Ctrl+v").unwrap();
        assert!(ctrl.requires_ctrl);
        assert_eq!(ctrl.key_code, KeyCode::Char('v'));
        assert_eq!(parse_key_binding("F1").unwrap().key_code, KeyCode::F(1));
        assert_eq!(parse_key_binding("Space").unwrap().key_code, KeyCode::Char(' '));
        assert!(parse_key_binding("Hyper").is_err());
    }

    #[test]
    fn test_expand_path_leaves_absolute_paths_alone() {
        assert_eq!(expand_path("/tmp/app.db"), PathBuf::from("/tmp/app.db"));
    }
}
