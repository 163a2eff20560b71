use crate::features::calculator::{CalculatorEngine, CalculatorSnapshot, EngineConfig};
use crate::features::history_store::CalculationRecord;
use crate::features::preferences::Preferences;
use crate::i18n::normalize_locale;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Calculator,
    History,
    Settings,
}

impl Screen {
    pub fn id(self) -> &'static str {
        match self {
            Screen::Calculator => "calculator",
            Screen::History => "history",
            Screen::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryScreenState {
    pub query: String,
    pub favorites_only: bool,
    pub records: Vec<CalculationRecord>,
    pub error: Option<String>,
}

/// What survives an activity restart. History rows are reloaded from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub nav_stack: Vec<Screen>,
    pub calculator: CalculatorSnapshot,
    #[serde(default)]
    pub history_query: String,
    #[serde(default)]
    pub favorites_only: bool,
    #[serde(default)]
    pub locale: Option<String>,
}

pub struct AppState {
    pub nav_stack: Vec<Screen>,
    pub engine: CalculatorEngine,
    pub history: HistoryScreenState,
    pub preferences: Preferences,
    pub locale: String,
    pub last_error: Option<String>,
}

impl AppState {
    pub fn new(preferences: Preferences) -> Self {
        let locale = normalize_locale(&preferences.language).to_string();
        let config = EngineConfig {
            locale: locale.clone(),
            ..EngineConfig::default()
        };
        let mut state = Self {
            nav_stack: vec![Screen::Calculator],
            engine: CalculatorEngine::new(config),
            history: HistoryScreenState::default(),
            preferences,
            locale,
            last_error: None,
        };
        state.apply_preferences();
        state
    }

    /// Push the engine-facing preferences (format mode, language) into the engine.
    pub fn apply_preferences(&mut self) {
        let mode = self.preferences.number_format_mode;
        if self.engine.format_mode() != mode {
            self.engine.set_format_mode(mode);
        }
        let locale = normalize_locale(&self.preferences.language).to_string();
        self.set_locale(&locale);
    }

    pub fn set_locale(&mut self, locale_str: &str) {
        let normalized = normalize_locale(locale_str);
        self.locale = normalized.to_string();
        if self.engine.locale() != normalized {
            self.engine.set_locale(normalized);
        }
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::Calculator);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().copied().unwrap_or(Screen::Calculator)
    }

    pub fn nav_depth(&self) -> usize {
        self.nav_stack.len().max(1)
    }

    /// Opening the screen already on top does not stack it twice.
    pub fn open_screen(&mut self, screen: Screen) {
        self.ensure_navigation();
        if self.current_screen() != screen {
            self.nav_stack.push(screen);
        }
    }

    pub fn pop_screen(&mut self) {
        self.ensure_navigation();
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    pub fn reset_navigation(&mut self) {
        self.nav_stack.clear();
        self.nav_stack.push(Screen::Calculator);
    }

    /// Back to a fresh calculator. The record sink and subscribers stay attached.
    pub fn reset_runtime(&mut self) {
        let config = EngineConfig {
            locale: self.locale.clone(),
            ..EngineConfig::default()
        };
        self.engine.restore(CalculatorEngine::new(config).snapshot());
        self.history = HistoryScreenState::default();
        self.last_error = None;
        self.apply_preferences();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            nav_stack: self.nav_stack.clone(),
            calculator: self.engine.snapshot(),
            history_query: self.history.query.clone(),
            favorites_only: self.history.favorites_only,
            locale: Some(self.locale.clone()),
        }
    }

    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.nav_stack = snapshot.nav_stack;
        self.ensure_navigation();
        self.engine.restore(snapshot.calculator);
        self.history = HistoryScreenState {
            query: snapshot.history_query,
            favorites_only: snapshot.favorites_only,
            ..HistoryScreenState::default()
        };
        if let Some(locale) = snapshot.locale {
            self.set_locale(&locale);
        }
    }
}
