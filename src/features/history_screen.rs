use crate::features::history_store::{CalculationRecord, HistoryStore, StoreError, DEFAULT_DAYS_TO_KEEP};
use crate::state::{AppState, Screen};
use crate::ui::{maybe_push_back, Button, Card, Checkbox, Column, Text, TextInput, VirtualList};
use serde_json::Value;

pub const QUERY_BINDING: &str = "history_query";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    Open,
    Search(String),
    ToggleFavorite(String),
    Delete(String),
    Reuse(String),
    Clear,
    Prune,
    FilterFavorites,
}

fn store_failed(err: StoreError) -> String {
    format!("store_failed:{err}")
}

/// Reload the visible rows. A non-empty query wins over the favorites filter.
pub fn refresh_history<S: HistoryStore + ?Sized>(state: &mut AppState, store: &S) {
    let query = state.history.query.trim().to_string();
    let loaded = if !query.is_empty() {
        store.search(&query).map(|rows| {
            if state.history.favorites_only {
                rows.into_iter().filter(|r| r.is_favorite).collect()
            } else {
                rows
            }
        })
    } else if state.history.favorites_only {
        store.get_favorites()
    } else {
        store.get_all()
    };
    match loaded {
        Ok(records) => {
            state.history.records = records;
            state.history.error = None;
        }
        Err(err) => {
            log::warn!("history refresh failed: {err}");
            state.history.error = Some(store_failed(err));
        }
    }
}

pub fn handle_history_action<S: HistoryStore + ?Sized>(
    state: &mut AppState,
    store: &S,
    action: HistoryAction,
    now_ms: i64,
) {
    let outcome = match action {
        HistoryAction::Open => {
            state.open_screen(Screen::History);
            Ok(())
        }
        HistoryAction::Search(query) => {
            state.history.query = query;
            Ok(())
        }
        HistoryAction::FilterFavorites => {
            state.history.favorites_only = !state.history.favorites_only;
            Ok(())
        }
        HistoryAction::ToggleFavorite(id) => store.toggle_favorite(&id),
        HistoryAction::Delete(id) => store.delete(&id),
        HistoryAction::Clear => store.clear_all(),
        HistoryAction::Prune => store.clean_old_history(DEFAULT_DAYS_TO_KEEP, now_ms),
        HistoryAction::Reuse(id) => match store.get_by_id(&id) {
            Ok(Some(record)) => {
                state.engine.set_expression(&record.input);
                state.reset_navigation();
                return;
            }
            Ok(None) => {
                state.last_error = Some(format!("history_not_found:{id}"));
                Ok(())
            }
            Err(err) => Err(err),
        },
    };
    if let Err(err) = outcome {
        log::warn!("history action failed: {err}");
        state.last_error = Some(store_failed(err));
    }
    refresh_history(state, store);
}

fn render_row(record: &CalculationRecord, locale: &str) -> Value {
    let line = format!("{} = {}", record.input, record.result);
    let star = if record.is_favorite { "★" } else { "☆" };
    let favorite = format!("history_favorite:{}", record.id);
    let reuse = format!("history_reuse:{}", record.id);
    let delete = format!("history_delete:{}", record.id);
    let when = chrono::DateTime::from_timestamp_millis(record.timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let delete_label = rust_i18n::t!("history.delete", locale = locale);
    serde_json::to_value(Card::new(vec![
        serde_json::to_value(Button::new(&line, &reuse)).unwrap(),
        serde_json::to_value(Text::new(&when).size(12.0)).unwrap(),
        serde_json::to_value(Button::new(star, &favorite)).unwrap(),
        serde_json::to_value(Button::new(&delete_label, &delete)).unwrap(),
    ]).padding(8))
    .unwrap()
}

pub fn render_history_screen(state: &AppState) -> Value {
    let title = rust_i18n::t!("history.title", locale = &state.locale);
    let favorites = rust_i18n::t!("history.favorites_only", locale = &state.locale);
    let search = rust_i18n::t!("history.search", locale = &state.locale);
    let mut children = vec![
        serde_json::to_value(Text::new(&title).size(20.0)).unwrap(),
        serde_json::to_value(
            TextInput::new(QUERY_BINDING)
                .text(&state.history.query)
                .hint(&search)
                .action_on_submit("history_search")
                .debounce_ms(250)
                .single_line(true),
        )
        .unwrap(),
        serde_json::to_value(
            Checkbox::new(&favorites, "history_favorites_only")
                .checked(state.history.favorites_only)
                .action("history_filter_favorites"),
        )
        .unwrap(),
    ];

    for err in [&state.history.error, &state.last_error].into_iter().flatten() {
        children.push(serde_json::to_value(Text::new(err).content_description("error")).unwrap());
    }

    if state.history.records.is_empty() {
        let empty = rust_i18n::t!("history.empty", locale = &state.locale);
        children.push(serde_json::to_value(Text::new(&empty)).unwrap());
    } else {
        let rows = state
            .history
            .records
            .iter()
            .map(|record| render_row(record, &state.locale))
            .collect();
        children.push(
            serde_json::to_value(VirtualList::new(rows).id("history_list").estimated_item_height(96))
                .unwrap(),
        );
        let prune = rust_i18n::t!("history.prune", locale = &state.locale);
        let clear = rust_i18n::t!("history.clear", locale = &state.locale);
        children.push(serde_json::to_value(Button::new(&prune, "history_prune")).unwrap());
        children.push(serde_json::to_value(Button::new(&clear, "history_clear")).unwrap());
    }

    maybe_push_back(&mut children, state);
    serde_json::to_value(Column::new(children).padding(20)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::history_store::SqliteHistoryStore;
    use crate::features::preferences::Preferences;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteHistoryStore, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::open(dir.path().join("history.db")).unwrap();
        let mut a = CalculationRecord::basic_math("1+1", "2", 1_000);
        a.id = "a".into();
        let mut b = CalculationRecord::basic_math("sqrt(16)", "4", 2_000);
        b.id = "b".into();
        store.save(&a).unwrap();
        store.save(&b).unwrap();
        (dir, store, AppState::new(Preferences::default()))
    }

    #[test]
    fn open_lists_newest_first() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Open, 0);
        assert_eq!(state.current_screen(), Screen::History);
        let ids: Vec<&str> = state.history.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn search_and_favorite_filter() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Search("sqrt".into()), 0);
        assert_eq!(state.history.records.len(), 1);

        handle_history_action(&mut state, &store, HistoryAction::Search(String::new()), 0);
        handle_history_action(&mut state, &store, HistoryAction::ToggleFavorite("a".into()), 0);
        handle_history_action(&mut state, &store, HistoryAction::FilterFavorites, 0);
        assert_eq!(state.history.records.len(), 1);
        assert_eq!(state.history.records[0].id, "a");
    }

    #[test]
    fn reuse_loads_expression_and_returns_to_calculator() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Open, 0);
        handle_history_action(&mut state, &store, HistoryAction::Reuse("b".into()), 0);
        assert_eq!(state.current_screen(), Screen::Calculator);
        assert_eq!(state.engine.expression(), "sqrt(16)");
    }

    #[test]
    fn missing_record_sets_error() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Reuse("zzz".into()), 0);
        assert_eq!(state.last_error.as_deref(), Some("history_not_found:zzz"));
    }

    #[test]
    fn delete_and_clear() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Delete("a".into()), 0);
        assert_eq!(state.history.records.len(), 1);
        handle_history_action(&mut state, &store, HistoryAction::Clear, 0);
        assert!(state.history.records.is_empty());
    }

    #[test]
    fn row_and_list_labels_follow_locale() {
        let (_dir, store, mut state) = setup();
        handle_history_action(&mut state, &store, HistoryAction::Open, 0);
        let ui = render_history_screen(&state).to_string();
        assert!(ui.contains("Supprimer"));
        assert!(ui.contains("Rechercher"));
        assert!(ui.contains("Effacer l'historique"));

        state.set_locale("en");
        let ui = render_history_screen(&state).to_string();
        assert!(ui.contains("\"Delete\""));
        assert!(ui.contains("Clear history"));
        assert!(!ui.contains("Supprimer"));
    }
}
