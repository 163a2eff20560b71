use crate::features::calculator_screen::{
    apply_calc_action, parse_calc_action, render_calculator_screen, CalcAction,
};
use crate::features::diagnostics::Diagnostics;
use crate::features::history_screen::{
    handle_history_action, render_history_screen, HistoryAction, QUERY_BINDING,
};
use crate::features::history_store::{SqliteHistoryStore, StoreError};
use crate::features::persistence::PersistenceWorker;
use crate::features::preferences::{
    apply_settings_action, render_settings_screen, PreferencesStore, SettingsAction,
};
use crate::features::storage::{history_db_path, preferences_path, resolve_data_dir};
use crate::state::{AppState, Screen, SessionSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("history store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("could not start persistence worker: {0}")]
    Worker(#[from] io::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct Command {
    pub action: String,
    pub bindings: Option<HashMap<String, String>>,
    pub snapshot: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug)]
enum Action {
    Init,
    Reset,
    Back,
    Snapshot,
    Restore { snapshot: String },
    SetLocale { locale: String },
    CalculatorScreen,
    SettingsScreen,
    Calc(CalcAction),
    History(HistoryAction),
    Settings(SettingsAction),
    DiagnosticsClear,
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        bindings,
        snapshot,
        locale,
    } = command;
    let bindings = bindings.unwrap_or_default();

    if let Some(calc) = parse_calc_action(&action, &bindings) {
        return calc.map(Action::Calc);
    }
    if let Some(settings) = SettingsAction::parse(&action) {
        return Ok(Action::Settings(settings));
    }

    let history_target = |prefix: &str| {
        action
            .strip_prefix(prefix)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    };
    if let Some(id) = history_target("history_favorite:") {
        return Ok(Action::History(HistoryAction::ToggleFavorite(id)));
    }
    if let Some(id) = history_target("history_delete:") {
        return Ok(Action::History(HistoryAction::Delete(id)));
    }
    if let Some(id) = history_target("history_reuse:") {
        return Ok(Action::History(HistoryAction::Reuse(id)));
    }

    match action.as_str() {
        "init" => Ok(Action::Init),
        "reset" => Ok(Action::Reset),
        "back" => Ok(Action::Back),
        "snapshot" => Ok(Action::Snapshot),
        "restore_state" => snapshot
            .ok_or_else(|| "missing_snapshot".to_string())
            .map(|snapshot| Action::Restore { snapshot }),
        "set_locale" => locale
            .or_else(|| bindings.get("locale").cloned())
            .ok_or_else(|| "missing_locale".to_string())
            .map(|locale| Action::SetLocale { locale }),
        "calculator_screen" => Ok(Action::CalculatorScreen),
        "history_screen" => Ok(Action::History(HistoryAction::Open)),
        "settings_screen" => Ok(Action::SettingsScreen),
        "history_search" => Ok(Action::History(HistoryAction::Search(
            bindings.get(QUERY_BINDING).cloned().unwrap_or_default(),
        ))),
        "history_clear" => Ok(Action::History(HistoryAction::Clear)),
        "history_prune" => Ok(Action::History(HistoryAction::Prune)),
        "history_filter_favorites" => Ok(Action::History(HistoryAction::FilterFavorites)),
        "diagnostics_clear" => Ok(Action::DiagnosticsClear),
        other => Err(format!("unknown_action:{other}")),
    }
}

/// Everything one app session needs, created by the JNI `create` entry point
/// and torn down by `destroy`.
pub struct CoreService {
    state: Mutex<AppState>,
    history: SqliteHistoryStore,
    preferences: PreferencesStore,
    diagnostics: Arc<Diagnostics>,
    worker: PersistenceWorker,
}

impl CoreService {
    pub fn new(preferred_dir: Option<&Path>) -> Result<Self, ServiceError> {
        Self::open(resolve_data_dir(preferred_dir))
    }

    pub fn open(data_dir: PathBuf) -> Result<Self, ServiceError> {
        let history = SqliteHistoryStore::open(history_db_path(&data_dir))?;
        let preferences = PreferencesStore::new(preferences_path(&data_dir));
        let prefs = preferences.load();

        let diagnostics = Arc::new(Diagnostics::default());
        diagnostics.set_enabled(prefs.crash_reporting_enabled);
        let worker = PersistenceWorker::spawn(history.clone(), diagnostics.clone())?;

        let mut state = AppState::new(prefs);
        state.engine.set_record_sink(Box::new(worker.handle()));
        log::info!("core service ready in {}", data_dir.display());

        Ok(Self {
            state: Mutex::new(state),
            history,
            preferences,
            diagnostics,
            worker,
        })
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.diagnostics
                    .record_error("router", "state lock poisoned by an earlier panic");
                poisoned.into_inner()
            }
        }
    }

    /// Decode one JSON command and answer with a UI tree. Never fails.
    pub fn dispatch_json(&self, input: &str) -> Value {
        let command = serde_json::from_str::<Command>(input).unwrap_or_else(|err| {
            log::warn!("invalid command json: {err}");
            Command {
                action: "invalid_json".into(),
                ..Command::default()
            }
        });
        match self.handle_command(command) {
            Ok(value) => value,
            Err(err) => error_ui(&err),
        }
    }

    pub fn handle_command(&self, command: Command) -> Result<Value, String> {
        let mut state = self.lock_state();
        state.ensure_navigation();

        if let Some(locale) = command.locale.as_deref() {
            state.set_locale(locale);
        }

        let action_name = command.action.clone();
        let action = match parse_action(command) {
            Ok(action) => action,
            Err(err) => {
                log::warn!("rejected command: {err}");
                state.last_error = Some(err);
                return Ok(self.render_ui(&state));
            }
        };
        self.diagnostics
            .record_action(&action_name, Some(state.current_screen().id()));
        state.last_error = None;

        match action {
            Action::Init => {}
            Action::Snapshot => {
                let snap = serde_json::to_string(&state.snapshot())
                    .map_err(|e| format!("snapshot_failed:{e}"))?;
                return Ok(json!({
                    "type": "Snapshot",
                    "snapshot": snap
                }));
            }
            Action::Restore { snapshot } => {
                match serde_json::from_str::<SessionSnapshot>(&snapshot) {
                    Ok(restored) => {
                        state.restore(restored);
                        if state.current_screen() == Screen::History {
                            self.refresh_history(&mut state);
                        }
                    }
                    Err(e) => state.last_error = Some(format!("restore_failed:{e}")),
                }
            }
            Action::Reset => {
                state.reset_runtime();
                state.reset_navigation();
            }
            Action::Back => state.pop_screen(),
            Action::SetLocale { locale } => {
                state.preferences.language = locale;
                state.apply_preferences();
                self.save_preferences(&mut state);
            }
            Action::CalculatorScreen => state.reset_navigation(),
            Action::SettingsScreen => state.open_screen(Screen::Settings),
            Action::Calc(calc) => {
                apply_calc_action(&mut state.engine, calc);
                // keypad format buttons update the stored preference too
                let mode = state.engine.format_mode();
                if state.preferences.number_format_mode != mode {
                    state.preferences.number_format_mode = mode;
                    self.save_preferences(&mut state);
                }
            }
            Action::History(history) => {
                // rows queued by the worker must be visible before listing
                if !self.worker.flush() {
                    log::warn!("persistence worker did not acknowledge flush");
                }
                let now_ms = chrono::Utc::now().timestamp_millis();
                handle_history_action(&mut state, &self.history, history, now_ms);
            }
            Action::Settings(settings) => {
                apply_settings_action(&mut state, settings);
                self.diagnostics
                    .set_enabled(state.preferences.crash_reporting_enabled);
                self.save_preferences(&mut state);
            }
            Action::DiagnosticsClear => self.diagnostics.clear(),
        }

        Ok(self.render_ui(&state))
    }

    fn refresh_history(&self, state: &mut AppState) {
        if !self.worker.flush() {
            log::warn!("persistence worker did not acknowledge flush");
        }
        crate::features::history_screen::refresh_history(state, &self.history);
    }

    fn save_preferences(&self, state: &mut AppState) {
        if let Err(err) = self.preferences.save(&state.preferences) {
            self.diagnostics
                .record_error("preferences", &format!("save_failed:{err}"));
            state.last_error = Some(format!("preferences_failed:{err}"));
        }
    }

    fn render_ui(&self, state: &AppState) -> Value {
        match state.current_screen() {
            Screen::Calculator => render_calculator_screen(state),
            Screen::History => render_history_screen(state),
            Screen::Settings => render_settings_screen(state, &self.diagnostics.events()),
        }
    }
}

pub fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}
