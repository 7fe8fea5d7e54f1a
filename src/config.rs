use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    /// `tracing` filter directive, overridden by `EDUPLAN_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used to turn pasted sheets into JSON
    #[serde(default = "default_import_model")]
    pub import_model: String,
    /// Model used to draft lesson outlines
    #[serde(default = "default_outline_model")]
    pub outline_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_search")]
    pub search: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_new_module")]
    pub new_module: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_toggle_task_status")]
    pub toggle_task_status: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_switch_pane")]
    pub switch_pane: String,
    #[serde(default = "default_tab_1")]
    pub tab_1: String,
    #[serde(default = "default_tab_2")]
    pub tab_2: String,
    #[serde(default = "default_prev_month")]
    pub prev_month: String,
    #[serde(default = "default_next_month")]
    pub next_month: String,
    #[serde(default = "default_today")]
    pub today: String,
    #[serde(default = "default_backlog")]
    pub backlog: String,
    #[serde(default = "default_import")]
    pub import: String,
    #[serde(default = "default_outline")]
    pub outline: String,
    #[serde(default = "default_paste")]
    pub paste: String,
    #[serde(default = "default_submit")]
    pub submit: String,
    #[serde(default = "default_cycle_theme")]
    pub cycle_theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    /// Accent for overdue items and armed deletes
    #[serde(default = "default_warning")]
    pub warning: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut themes = HashMap::new();

        // Example custom theme so users can see how to define their own
        themes.insert("lightblue".to_string(), Theme {
            fg: "cyan".to_string(),
            bg: "black".to_string(),
            highlight_bg: "blue".to_string(),
            highlight_fg: "white".to_string(),
            tab_bg: "gray".to_string(),
            warning: "lightred".to_string(),
        });

        Self {
            sidebar_width_percent: default_sidebar_width(),
            database_path: default_database_path(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes,
            log_filter: default_log_filter(),
            gemini: GeminiConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            import_model: default_import_model(),
            outline_model: default_outline_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            help: default_help(),
            search: default_search(),
            new: default_new(),
            new_module: default_new_module(),
            edit: default_edit(),
            delete: default_delete(),
            select: default_select(),
            toggle_task_status: default_toggle_task_status(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            switch_pane: default_switch_pane(),
            tab_1: default_tab_1(),
            tab_2: default_tab_2(),
            prev_month: default_prev_month(),
            next_month: default_next_month(),
            today: default_today(),
            backlog: default_backlog(),
            import: default_import(),
            outline: default_outline(),
            paste: default_paste(),
            submit: default_submit(),
            cycle_theme: default_cycle_theme(),
        }
    }
}

impl KeyBindings {
    /// Every binding paired with its config field name
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("quit", &self.quit),
            ("help", &self.help),
            ("search", &self.search),
            ("new", &self.new),
            ("new_module", &self.new_module),
            ("edit", &self.edit),
            ("delete", &self.delete),
            ("select", &self.select),
            ("toggle_task_status", &self.toggle_task_status),
            ("list_up", &self.list_up),
            ("list_down", &self.list_down),
            ("switch_pane", &self.switch_pane),
            ("tab_1", &self.tab_1),
            ("tab_2", &self.tab_2),
            ("prev_month", &self.prev_month),
            ("next_month", &self.next_month),
            ("today", &self.today),
            ("backlog", &self.backlog),
            ("import", &self.import),
            ("outline", &self.outline),
            ("paste", &self.paste),
            ("submit", &self.submit),
            ("cycle_theme", &self.cycle_theme),
        ]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            warning: default_warning(),
        }
    }
}

impl Theme {
    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let preset = |fg: &str, bg: &str, highlight_bg: &str, highlight_fg: &str, warning: &str| Theme {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            tab_bg: "gray".to_string(),
            warning: warning.to_string(),
        };

        let mut themes = HashMap::new();
        themes.insert("default".to_string(), preset("white", "black", "blue", "white", "red"));
        themes.insert("dark".to_string(), preset("white", "black", "cyan", "black", "lightred"));
        themes.insert("light".to_string(), preset("black", "white", "blue", "white", "red"));
        themes.insert("green".to_string(), preset("green", "black", "yellow", "black", "red"));
        themes.insert("monochrome".to_string(), preset("white", "black", "white", "black", "white"));
        themes
    }
}

// Default value functions
fn default_sidebar_width() -> u16 {
    30
}

fn default_database_path() -> String {
    // Fallback only; the real path is fixed per profile at load time
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_log_filter() -> String {
    "eduplan=info".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_import_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_outline_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_search() -> String {
    "/".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_new_module() -> String {
    "m".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_select() -> String {
    "Enter".to_string()
}

fn default_toggle_task_status() -> String {
    "Space".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_switch_pane() -> String {
    "Tab".to_string()
}

fn default_tab_1() -> String {
    "1".to_string()
}

fn default_tab_2() -> String {
    "2".to_string()
}

fn default_prev_month() -> String {
    "[".to_string()
}

fn default_next_month() -> String {
    "]".to_string()
}

fn default_today() -> String {
    "g".to_string()
}

fn default_backlog() -> String {
    "b".to_string()
}

fn default_import() -> String {
    "i".to_string()
}

fn default_outline() -> String {
    "o".to_string()
}

fn default_paste() -> String {
    "Ctrl+v".to_string()
}

fn default_submit() -> String {
    "Ctrl+s".to_string()
}

fn default_cycle_theme() -> String {
    "t".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_warning() -> String {
    "red".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load configuration from the profile's config file, or create it with defaults if missing.
    /// The database path is always pinned to the profile's data directory.
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let mut config = Self::read_file(&config_path)?;
            // Ensure database path matches profile (in case config was manually edited)
            config.database_path = Self::default_database_path_for_profile(profile);
            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            if let Err(e) = config.save_with_profile(profile) {
                tracing::error!(error = %e, path = ?config_path, "failed to save default config");
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Load configuration from an explicit file. The file's `database_path` is honoured.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::read_file(path)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to the profile's config file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        let config_path = Self::get_config_path(profile)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("app.db").to_string_lossy().to_string()
        } else {
            // Fallback paths - platform-specific
            #[cfg(target_os = "macos")]
            {
                match profile {
                    utils::Profile::Dev => "~/Library/Application Support/eduplan-dev/app.db".to_string(),
                    utils::Profile::Prod => "~/Library/Application Support/eduplan/app.db".to_string(),
                }
            }
            #[cfg(not(target_os = "macos"))]
            {
                match profile {
                    utils::Profile::Dev => "~/.local/share/eduplan-dev/app.db".to_string(),
                    utils::Profile::Prod => "~/.local/share/eduplan/app.db".to_string(),
                }
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Log file sits next to the database
    pub fn get_log_path(&self) -> PathBuf {
        let db_path = self.get_database_path();
        db_path
            .parent()
            .map(|dir| dir.join("eduplan.log"))
            .unwrap_or_else(|| PathBuf::from("eduplan.log"))
    }

    /// Get the currently active theme
    /// If highlight_fg is not set (empty string), it will be calculated from highlight_bg
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color, parse_color};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .or_else(|| Theme::get_preset_themes().remove("default"))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            let highlight_bg_color = parse_color(&theme.highlight_bg);
            let calculated_fg = get_contrast_text_color(highlight_bg_color);
            theme.highlight_fg = format_color_for_display(&calculated_fg);
        }

        theme
    }

    /// Set the active theme by name
    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }

        self.current_theme = name.to_string();
        Ok(())
    }

    /// Get all available theme names (presets + user-defined), sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Theme::get_preset_themes().keys().cloned().collect();

        for theme_name in self.themes.keys() {
            if !themes.contains(theme_name) {
                themes.push(theme_name.clone());
            }
        }

        themes.sort();
        themes
    }

    /// Name of the theme after the current one, wrapping around
    pub fn next_theme_name(&self) -> String {
        let themes = self.get_available_themes();
        let next = themes
            .iter()
            .position(|t| *t == self.current_theme)
            .map_or(0, |i| (i + 1) % themes.len());
        themes
            .get(next)
            .cloned()
            .unwrap_or_else(default_current_theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "current_theme = \"dark\"\n[gemini]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.current_theme, "dark");
        assert_eq!(config.gemini.timeout_secs, 5);
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.key_bindings.import, "i");
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.gemini.import_model, config.gemini.import_model);
        assert_eq!(parsed.themes.len(), config.themes.len());
    }

    #[test]
    fn test_unknown_theme_is_rejected() {
        let mut config = Config::default();
        assert!(matches!(config.set_theme("neon"), Err(ConfigError::ThemeNotFound(_))));
        config.set_theme("lightblue").unwrap();
        assert_eq!(config.get_active_theme().fg, "cyan");
    }

    #[test]
    fn test_next_theme_wraps() {
        let mut config = Config::default();
        let themes = config.get_available_themes();
        config.current_theme = themes.last().cloned().unwrap();
        assert_eq!(config.next_theme_name(), themes[0]);
    }

    #[test]
    fn test_log_path_sits_next_to_database() {
        let config = Config {
            database_path: "/tmp/eduplan/app.db".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_log_path(), PathBuf::from("/tmp/eduplan/eduplan.log"));
    }
}
