use crate::features::diagnostics::{DiagnosticEvent, DiagnosticLevel};
use crate::features::number_format::FormatMode;
use crate::i18n::{normalize_locale, SUPPORTED_LOCALES};
use crate::state::AppState;
use crate::ui::{maybe_push_back, Button, Checkbox, Column, Section, Text};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};
use thiserror::Error;

const DIAGNOSTIC_ROWS: usize = 20;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid preferences file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace preferences file: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn next(self) -> Self {
        match self {
            ThemeMode::Auto => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Auto,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Auto => "Auto",
            ThemeMode::Light => "Light",
            ThemeMode::Dark => "Dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme_mode: ThemeMode,
    pub language: String,
    pub haptic_feedback_enabled: bool,
    pub keep_screen_on_enabled: bool,
    pub number_format_mode: FormatMode,
    pub crash_reporting_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Auto,
            language: "fr".to_string(),
            haptic_feedback_enabled: true,
            keep_screen_on_enabled: false,
            number_format_mode: FormatMode::Plain,
            crash_reporting_enabled: true,
        }
    }
}

/// JSON-backed key/value settings.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn load(&self) -> Preferences {
        match self.try_load() {
            Ok(prefs) => prefs,
            Err(err) => {
                log::warn!("using default preferences: {err}");
                Preferences::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Preferences, PreferencesError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, prefs)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    CycleTheme,
    CycleLanguage,
    ToggleHaptic,
    ToggleKeepScreenOn,
    CycleFormat,
    ToggleCrashReporting,
}

impl SettingsAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "settings_theme" => Some(SettingsAction::CycleTheme),
            "settings_language" => Some(SettingsAction::CycleLanguage),
            "settings_haptic" => Some(SettingsAction::ToggleHaptic),
            "settings_keep_screen_on" => Some(SettingsAction::ToggleKeepScreenOn),
            "settings_format" => Some(SettingsAction::CycleFormat),
            "settings_crash_reporting" => Some(SettingsAction::ToggleCrashReporting),
            _ => None,
        }
    }
}

fn next_format(mode: FormatMode) -> FormatMode {
    match mode {
        FormatMode::Plain => FormatMode::Thousands,
        FormatMode::Thousands => FormatMode::Scientific,
        FormatMode::Scientific => FormatMode::Plain,
    }
}

fn next_language(current: &str) -> &'static str {
    let current = normalize_locale(current);
    let pos = SUPPORTED_LOCALES.iter().position(|l| *l == current).unwrap_or(0);
    SUPPORTED_LOCALES[(pos + 1) % SUPPORTED_LOCALES.len()]
}

/// Mutates the in-memory preferences and pushes engine-facing values into the
/// calculator. Persisting is left to the caller.
pub fn apply_settings_action(state: &mut AppState, action: SettingsAction) {
    let prefs = &mut state.preferences;
    match action {
        SettingsAction::CycleTheme => prefs.theme_mode = prefs.theme_mode.next(),
        SettingsAction::CycleLanguage => prefs.language = next_language(&prefs.language).to_string(),
        SettingsAction::ToggleHaptic => prefs.haptic_feedback_enabled = !prefs.haptic_feedback_enabled,
        SettingsAction::ToggleKeepScreenOn => {
            prefs.keep_screen_on_enabled = !prefs.keep_screen_on_enabled
        }
        SettingsAction::CycleFormat => prefs.number_format_mode = next_format(prefs.number_format_mode),
        SettingsAction::ToggleCrashReporting => {
            prefs.crash_reporting_enabled = !prefs.crash_reporting_enabled
        }
    }
    state.apply_preferences();
}

pub fn render_settings_screen(state: &AppState, events: &[DiagnosticEvent]) -> Value {
    let prefs = &state.preferences;
    let locale = state.locale.as_str();
    let title = rust_i18n::t!("settings.title", locale = locale);
    let theme = format!("{}: {}", rust_i18n::t!("settings.theme", locale = locale), prefs.theme_mode.label());
    let language = format!("{}: {}", rust_i18n::t!("settings.language", locale = locale), normalize_locale(&prefs.language));
    let format = format!("{}: {}", rust_i18n::t!("settings.number_format", locale = locale), prefs.number_format_mode.as_str());
    let haptic = rust_i18n::t!("settings.haptic", locale = locale);
    let keep_screen_on = rust_i18n::t!("settings.keep_screen_on", locale = locale);
    let crash_reporting = rust_i18n::t!("settings.crash_reporting", locale = locale);

    let mut children = vec![
        serde_json::to_value(Text::new(&title).size(20.0)).unwrap(),
        serde_json::to_value(Button::new(&theme, "settings_theme")).unwrap(),
        serde_json::to_value(Button::new(&language, "settings_language")).unwrap(),
        serde_json::to_value(Button::new(&format, "settings_format")).unwrap(),
        serde_json::to_value(
            Checkbox::new(&haptic, "settings_haptic")
                .checked(prefs.haptic_feedback_enabled)
                .action("settings_haptic"),
        )
        .unwrap(),
        serde_json::to_value(
            Checkbox::new(&keep_screen_on, "settings_keep_screen_on")
                .checked(prefs.keep_screen_on_enabled)
                .action("settings_keep_screen_on"),
        )
        .unwrap(),
        serde_json::to_value(
            Checkbox::new(&crash_reporting, "settings_crash_reporting")
                .checked(prefs.crash_reporting_enabled)
                .action("settings_crash_reporting"),
        )
        .unwrap(),
    ];

    if let Some(err) = &state.last_error {
        children.push(serde_json::to_value(Text::new(err).content_description("error")).unwrap());
    }

    let diagnostics_title = rust_i18n::t!("settings.diagnostics", locale = locale);
    let summary = format!("{} {}", events.len(), rust_i18n::t!("settings.events", locale = locale));
    let mut rows: Vec<Value> = events
        .iter()
        .rev()
        .take(DIAGNOSTIC_ROWS)
        .map(|event| {
            let marker = match event.level {
                DiagnosticLevel::Breadcrumb => "·",
                DiagnosticLevel::Warn => "!",
                DiagnosticLevel::Error => "✖",
            };
            let line = format!("{marker} [{}] {}", event.category, event.message);
            serde_json::to_value(Text::new(&line).size(12.0)).unwrap()
        })
        .collect();
    let clear = rust_i18n::t!("settings.clear_diagnostics", locale = locale);
    rows.push(serde_json::to_value(Button::new(&clear, "diagnostics_clear")).unwrap());
    children.push(
        serde_json::to_value(Section::new(rows).title(&diagnostics_title).subtitle(&summary)).unwrap(),
    );

    maybe_push_back(&mut children, state);
    serde_json::to_value(Column::new(children).padding(20)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("preferences.json"));
        let prefs = store.try_load().unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.language, "fr");
        assert!(prefs.haptic_feedback_enabled);
        assert!(!prefs.keep_screen_on_enabled);
        assert_eq!(prefs.number_format_mode, FormatMode::Plain);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("nested").join("preferences.json"));
        let prefs = Preferences {
            theme_mode: ThemeMode::Dark,
            language: "en".into(),
            number_format_mode: FormatMode::Scientific,
            ..Preferences::default()
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"SCIENTIFIC\""));
        assert!(raw.contains("\"DARK\""));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();
        let store = PreferencesStore::new(&path);
        assert!(matches!(store.try_load(), Err(PreferencesError::Json(_))));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn partial_file_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, r#"{"number_format_mode":"THOUSANDS"}"#).unwrap();
        let prefs = PreferencesStore::new(&path).load();
        assert_eq!(prefs.number_format_mode, FormatMode::Thousands);
        assert_eq!(prefs.theme_mode, ThemeMode::Auto);
    }

    #[test]
    fn cycles_wrap_around() {
        assert_eq!(ThemeMode::Dark.next(), ThemeMode::Auto);
        assert_eq!(next_format(FormatMode::Scientific), FormatMode::Plain);
        assert_eq!(next_language("fr-FR"), "en");
        assert_eq!(next_language("en"), "fr");
    }

    #[test]
    fn settings_actions_reach_the_engine() {
        let mut state = AppState::new(Preferences::default());
        assert_eq!(state.locale, "fr");
        apply_settings_action(&mut state, SettingsAction::CycleFormat);
        assert_eq!(state.engine.format_mode(), FormatMode::Thousands);
        apply_settings_action(&mut state, SettingsAction::CycleLanguage);
        assert_eq!(state.locale, "en");
        assert_eq!(state.engine.locale(), "en");
        assert_eq!(SettingsAction::parse("settings_haptic"), Some(SettingsAction::ToggleHaptic));
        assert_eq!(SettingsAction::parse("settings_nope"), None);
    }

    #[test]
    fn settings_labels_follow_locale() {
        let mut state = AppState::new(Preferences::default());
        let ui = render_settings_screen(&state, &[]).to_string();
        assert!(ui.contains("Langue: fr"));
        assert!(ui.contains("Retour haptique"));
        assert!(ui.contains("Effacer les diagnostics"));

        apply_settings_action(&mut state, SettingsAction::CycleLanguage);
        let ui = render_settings_screen(&state, &[]).to_string();
        assert!(ui.contains("Language: en"));
        assert!(ui.contains("Keep screen on"));
        assert!(ui.contains("0 events"));
    }
}
