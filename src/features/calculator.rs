use crate::features::calc_log::{CalcLog, LogEntry, LogEntryDisplay, DEFAULT_LOG_CAPACITY};
use crate::features::edit_history::{EditHistory, DEFAULT_EDIT_CAPACITY};
use crate::features::evaluator::{evaluate, is_function_name, AngleMode, EvalError, CONSTANTS};
use crate::features::history_store::CalculationRecord;
use crate::features::memory::MemoryCell;
use crate::features::number_format::{error_message, format_number, FormatMode};
use crate::features::result_cache::ResultCache;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

const BINARY_OPERATORS: [char; 6] = ['+', '-', '*', '/', '^', '%'];
// After these a '-' is read as a sign rather than replacing the operator.
const SIGN_PREFIXES: [char; 5] = ['*', '/', '^', '%', '('];

/// Receives every successful evaluation. Implementations must not block.
pub trait RecordSink: Send {
    fn save(&self, record: CalculationRecord);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationStatus {
    #[default]
    Ready,
    Processing,
    JustEvaluated,
    Error,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_expression_len: usize,
    pub undo_capacity: usize,
    pub log_capacity: usize,
    pub cache_capacity: usize,
    pub locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expression_len: 500,
            undo_capacity: DEFAULT_EDIT_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
            cache_capacity: 200,
            locale: "en".to_string(),
        }
    }
}

/// Read-only view of the engine, published to subscribers and used to
/// persist the calculator across process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorSnapshot {
    pub expression: String,
    pub result: String,
    pub status: OperationStatus,
    pub angle_mode: AngleMode,
    pub format_mode: FormatMode,
    #[serde(default)]
    pub memory: MemoryCell,
    #[serde(default)]
    pub last_value: Option<f64>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl CalculatorSnapshot {
    pub fn memory_has_value(&self) -> bool {
        self.memory.has_value()
    }

    pub fn history(&self) -> Vec<LogEntryDisplay> {
        self.log.iter().map(LogEntry::display).collect()
    }
}

pub struct CalculatorEngine {
    config: EngineConfig,
    expression: String,
    result: String,
    status: OperationStatus,
    angle_mode: AngleMode,
    format_mode: FormatMode,
    memory: MemoryCell,
    edits: EditHistory,
    log: CalcLog,
    last_value: Option<f64>,
    last_error: Option<EvalError>,
    cache: ResultCache<(String, AngleMode), f64>,
    subscribers: Vec<mpsc::Sender<CalculatorSnapshot>>,
    last_published: Option<CalculatorSnapshot>,
    sink: Option<Box<dyn RecordSink>>,
}

impl Default for CalculatorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CalculatorEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            expression: String::new(),
            result: "0".to_string(),
            status: OperationStatus::Ready,
            angle_mode: AngleMode::default(),
            format_mode: FormatMode::default(),
            memory: MemoryCell::new(),
            edits: EditHistory::with_capacity(config.undo_capacity),
            log: CalcLog::with_capacity(config.log_capacity),
            last_value: None,
            last_error: None,
            cache: ResultCache::new(config.cache_capacity),
            subscribers: Vec::new(),
            last_published: None,
            sink: None,
            config,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.angle_mode
    }

    pub fn format_mode(&self) -> FormatMode {
        self.format_mode
    }

    pub fn memory_has_value(&self) -> bool {
        self.memory.has_value()
    }

    pub fn history(&self) -> Vec<LogEntryDisplay> {
        self.log.display_lines()
    }

    pub fn log(&self) -> &CalcLog {
        &self.log
    }

    pub fn last_error(&self) -> Option<&EvalError> {
        self.last_error.as_ref()
    }

    pub fn locale(&self) -> &str {
        &self.config.locale
    }

    pub fn can_undo(&self) -> bool {
        self.edits.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.edits.can_redo()
    }

    pub fn snapshot(&self) -> CalculatorSnapshot {
        CalculatorSnapshot {
            expression: self.expression.clone(),
            result: self.result.clone(),
            status: self.status,
            angle_mode: self.angle_mode,
            format_mode: self.format_mode,
            memory: self.memory,
            last_value: self.last_value,
            log: self.log.entries().cloned().collect(),
        }
    }

    /// Replace the observable state. Undo/redo stacks start empty.
    pub fn restore(&mut self, snapshot: CalculatorSnapshot) {
        let CalculatorSnapshot {
            expression,
            result,
            status,
            angle_mode,
            format_mode,
            memory,
            last_value,
            log,
        } = snapshot;
        self.expression = truncate_chars(&expression, self.config.max_expression_len);
        self.result = result;
        self.status = status;
        self.angle_mode = angle_mode;
        self.format_mode = format_mode;
        self.memory = memory;
        self.last_value = last_value;
        self.last_error = None;
        self.log.restore(log);
        self.edits.clear();
        self.publish();
    }

    /// The receiver immediately gets the current state, then one snapshot per
    /// observable change.
    pub fn subscribe(&mut self) -> mpsc::Receiver<CalculatorSnapshot> {
        let (tx, rx) = mpsc::channel();
        let current = self.snapshot();
        if tx.send(current.clone()).is_ok() {
            self.subscribers.push(tx);
        }
        self.last_published = Some(current);
        rx
    }

    pub fn set_record_sink(&mut self, sink: Box<dyn RecordSink>) {
        self.sink = Some(sink);
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.config.locale = locale.to_string();
        if self.status == OperationStatus::Error {
            if let Some(err) = &self.last_error {
                self.result = error_message(err, &self.config.locale);
            }
        }
        self.publish();
    }

    pub fn on_number(&mut self, digit: &str) {
        if digit.is_empty() || !digit.chars().all(|c| c.is_ascii_digit()) {
            log::debug!("ignoring non-digit input {digit:?}");
            return;
        }
        let mut next = self.fresh_base();
        next.push_str(digit);
        self.apply_edit(next);
    }

    pub fn on_operator(&mut self, op: &str) {
        let Some(op) = normalize_operator(op) else {
            log::debug!("ignoring unknown operator {op:?}");
            return;
        };
        let base = if self.status == OperationStatus::JustEvaluated {
            match self.last_value {
                Some(value) => format_number(value, FormatMode::Plain),
                None => self.expression.clone(),
            }
        } else {
            self.expression.clone()
        };

        let mut next = base;
        match next.chars().last() {
            None => {
                if op != '-' {
                    return;
                }
            }
            Some(last) if op == '-' && SIGN_PREFIXES.contains(&last) => {}
            Some('(') => return,
            Some(last) if BINARY_OPERATORS.contains(&last) => {
                while next.ends_with(|c: char| BINARY_OPERATORS.contains(&c)) {
                    next.pop();
                }
                // only a sign may open an operand
                if op != '-' && (next.is_empty() || next.ends_with('(')) {
                    self.apply_edit(next);
                    return;
                }
            }
            Some(_) => {}
        }
        next.push(op);
        self.apply_edit(next);
    }

    /// Functions append `name(`; the constants `pi` and `e` append themselves.
    pub fn on_function(&mut self, name: &str) {
        let name = match name {
            "√" => "sqrt",
            "π" => "pi",
            other => other,
        };
        let is_constant = CONSTANTS.contains(&name);
        if !is_constant && !is_function_name(name) {
            log::debug!("ignoring unknown function {name:?}");
            return;
        }
        let mut next = self.fresh_base();
        next.push_str(name);
        if !is_constant {
            next.push('(');
        }
        self.apply_edit(next);
    }

    pub fn on_decimal(&mut self) {
        let mut next = self.fresh_base();
        let segment: String = next
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if segment.contains('.') {
            return;
        }
        if segment.is_empty() {
            next.push_str("0.");
        } else {
            next.push('.');
        }
        self.apply_edit(next);
    }

    pub fn on_left_paren(&mut self) {
        let mut next = self.fresh_base();
        next.push('(');
        self.apply_edit(next);
    }

    pub fn on_right_paren(&mut self) {
        let open = self.expression.chars().filter(|c| *c == '(').count();
        let close = self.expression.chars().filter(|c| *c == ')').count();
        if open <= close {
            return;
        }
        match self.expression.chars().last() {
            None | Some('(') => return,
            Some(last) if BINARY_OPERATORS.contains(&last) => return,
            Some(_) => {}
        }
        let mut next = self.expression.clone();
        next.push(')');
        self.apply_edit(next);
    }

    pub fn on_delete(&mut self) {
        let mut next = self.expression.clone();
        if next.pop().is_none() {
            return;
        }
        self.apply_edit(next);
    }

    /// Resets buffer and result. Memory and log are kept.
    pub fn on_clear(&mut self) {
        if !self.expression.is_empty() {
            let previous = std::mem::take(&mut self.expression);
            self.edits.record(previous);
        }
        self.result = "0".to_string();
        self.status = OperationStatus::Ready;
        self.last_value = None;
        self.last_error = None;
        self.publish();
    }

    pub fn on_clear_all(&mut self) {
        self.log.clear();
        self.on_clear();
    }

    pub fn on_evaluate(&mut self) {
        if self.expression.trim().is_empty() || self.status == OperationStatus::JustEvaluated {
            return;
        }
        self.status = OperationStatus::Processing;
        let expression = self.expression.clone();
        match self.evaluate_cached(&expression) {
            Ok(value) => {
                let result = format_number(value, self.format_mode);
                let timestamp_ms = chrono::Utc::now().timestamp_millis();
                self.log.push(LogEntry {
                    expression: self.expression.clone(),
                    result: result.clone(),
                    value,
                    timestamp_ms,
                    angle_mode: self.angle_mode,
                });
                if let Some(sink) = &self.sink {
                    sink.save(CalculationRecord::basic_math(&self.expression, &result, timestamp_ms));
                }
                self.result = result;
                self.last_value = Some(value);
                self.last_error = None;
                self.status = OperationStatus::JustEvaluated;
            }
            Err(err) => {
                log::debug!("evaluation of {:?} failed: {err}", self.expression);
                self.result = error_message(&err, &self.config.locale);
                self.last_value = None;
                self.last_error = Some(err);
                self.status = OperationStatus::Error;
            }
        }
        self.publish();
    }

    pub fn on_toggle_angle_mode(&mut self) {
        self.set_angle_mode(self.angle_mode.next());
    }

    pub fn set_angle_mode(&mut self, mode: AngleMode) {
        self.angle_mode = mode;
        self.publish();
    }

    pub fn on_memory_plus(&mut self) {
        if let Some(value) = self.current_value() {
            self.memory.add(value);
            self.publish();
        }
    }

    pub fn on_memory_minus(&mut self) {
        if let Some(value) = self.current_value() {
            self.memory.subtract(value);
            self.publish();
        }
    }

    pub fn on_memory_store(&mut self) {
        if let Some(value) = self.current_value() {
            self.memory.store(value);
            self.publish();
        }
    }

    pub fn on_memory_recall(&mut self) {
        let Some(value) = self.memory.recall() else {
            return;
        };
        let text = format_number(value, FormatMode::Plain);
        let token = if value < 0.0 { format!("({text})") } else { text };
        let mut next = self.fresh_base();
        next.push_str(&token);
        self.apply_edit(next);
    }

    pub fn on_memory_clear(&mut self) {
        self.memory.clear();
        self.publish();
    }

    /// Direct overwrite of the buffer, truncated to the maximum length.
    pub fn set_expression(&mut self, text: &str) {
        let next = truncate_chars(text, self.config.max_expression_len);
        if next == self.expression && self.status != OperationStatus::Processing {
            // same text, but it becomes editable again
            self.after_buffer_change();
            return;
        }
        self.apply_edit(next);
    }

    pub fn undo(&mut self) {
        if let Some(previous) = self.edits.undo(self.expression.clone()) {
            self.replace_buffer(previous);
        }
    }

    pub fn redo(&mut self) {
        if let Some(next) = self.edits.redo(self.expression.clone()) {
            self.replace_buffer(next);
        }
    }

    pub fn set_format_mode(&mut self, mode: FormatMode) {
        self.format_mode = mode;
        if self.status == OperationStatus::JustEvaluated {
            if let Some(value) = self.last_value {
                self.result = format_number(value, mode);
            }
        }
        self.publish();
    }

    pub fn reuse_log_entry(&mut self, index: usize) -> bool {
        let Some(expression) = self.log.get(index).map(|entry| entry.expression.clone()) else {
            return false;
        };
        self.set_expression(&expression);
        true
    }

    pub fn remove_log_entry(&mut self, index: usize) -> bool {
        let removed = self.log.remove(index).is_some();
        if removed {
            self.publish();
        }
        removed
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.publish();
    }

    // Buffer the next keystroke builds on: a finished result is discarded.
    fn fresh_base(&self) -> String {
        if self.status == OperationStatus::JustEvaluated {
            String::new()
        } else {
            self.expression.clone()
        }
    }

    fn apply_edit(&mut self, next: String) {
        if next == self.expression {
            return;
        }
        if next.chars().count() > self.config.max_expression_len {
            log::debug!("expression length limit reached");
            return;
        }
        let previous = std::mem::replace(&mut self.expression, next);
        self.edits.record(previous);
        self.after_buffer_change();
    }

    fn replace_buffer(&mut self, next: String) {
        self.expression = next;
        self.after_buffer_change();
    }

    fn after_buffer_change(&mut self) {
        self.status = if self.expression.is_empty() {
            OperationStatus::Ready
        } else {
            OperationStatus::Processing
        };
        self.last_error = None;
        self.publish();
    }

    fn current_value(&mut self) -> Option<f64> {
        if self.status == OperationStatus::JustEvaluated {
            return self.last_value;
        }
        if self.expression.trim().is_empty() {
            return None;
        }
        let expression = self.expression.clone();
        match self.evaluate_cached(&expression) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!("memory operation skipped: {err}");
                None
            }
        }
    }

    fn evaluate_cached(&mut self, expression: &str) -> Result<f64, EvalError> {
        let key = (expression.to_string(), self.angle_mode);
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }
        let value = evaluate(expression, self.angle_mode)?;
        self.cache.insert(key, value);
        Ok(value)
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        if self.last_published.as_ref() == Some(&snapshot) {
            return;
        }
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        self.last_published = Some(snapshot);
    }
}

fn normalize_operator(op: &str) -> Option<char> {
    match op {
        "+" => Some('+'),
        "-" | "−" => Some('-'),
        "*" | "×" => Some('*'),
        "/" | "÷" => Some('/'),
        "^" => Some('^'),
        "%" => Some('%'),
        _ => None,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn type_keys(engine: &mut CalculatorEngine, keys: &str) {
        for c in keys.chars() {
            match c {
                '0'..='9' => engine.on_number(&c.to_string()),
                '.' => engine.on_decimal(),
                '(' => engine.on_left_paren(),
                ')' => engine.on_right_paren(),
                _ => engine.on_operator(&c.to_string()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct CollectingSink {
        records: Arc<Mutex<Vec<CalculationRecord>>>,
    }

    impl RecordSink for CollectingSink {
        fn save(&self, record: CalculationRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    #[test]
    fn starts_ready_with_zero_result() {
        let engine = CalculatorEngine::default();
        assert_eq!(engine.expression(), "");
        assert_eq!(engine.result(), "0");
        assert_eq!(engine.status(), OperationStatus::Ready);
        assert_eq!(engine.angle_mode(), AngleMode::Radians);
        assert!(!engine.memory_has_value());
    }

    #[test]
    fn evaluates_with_precedence() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "2+3*4");
        assert_eq!(engine.status(), OperationStatus::Processing);
        engine.on_evaluate();
        assert_eq!(engine.result(), "14");
        assert_eq!(engine.status(), OperationStatus::JustEvaluated);
    }

    #[test]
    fn memory_cycle_recalls_difference() {
        let mut engine = CalculatorEngine::default();
        engine.on_number("5");
        engine.on_memory_plus();
        engine.on_clear();
        engine.on_number("2");
        engine.on_memory_minus();
        engine.on_clear();
        engine.on_memory_recall();
        engine.on_evaluate();
        assert_eq!(engine.result(), "3");
    }

    #[test]
    fn negative_memory_is_recalled_in_parentheses() {
        let mut engine = CalculatorEngine::default();
        engine.on_number("4");
        engine.on_memory_minus();
        engine.on_clear();
        engine.on_number("2");
        engine.on_operator("*");
        engine.on_memory_recall();
        assert_eq!(engine.expression(), "2*(-4)");
        engine.on_evaluate();
        assert_eq!(engine.result(), "-8");
    }

    #[test]
    fn recall_on_empty_memory_is_noop() {
        let mut engine = CalculatorEngine::default();
        engine.on_number("7");
        engine.on_memory_recall();
        assert_eq!(engine.expression(), "7");
    }

    #[test]
    fn failed_memory_operation_leaves_memory_untouched() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "5/0");
        engine.on_memory_plus();
        assert!(!engine.memory_has_value());
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "12+3");
        for _ in 0..4 {
            engine.undo();
        }
        assert_eq!(engine.expression(), "");
        assert_eq!(engine.status(), OperationStatus::Ready);
        for _ in 0..4 {
            engine.redo();
        }
        assert_eq!(engine.expression(), "12+3");
    }

    #[test]
    fn new_edit_after_undo_clears_redo() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "12");
        engine.undo();
        assert!(engine.can_redo());
        engine.on_number("9");
        assert!(!engine.can_redo());
        engine.redo();
        assert_eq!(engine.expression(), "19");
    }

    #[test]
    fn delete_and_clear_are_undoable() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "123");
        engine.on_delete();
        assert_eq!(engine.expression(), "12");
        engine.on_clear();
        assert_eq!(engine.expression(), "");
        engine.undo();
        assert_eq!(engine.expression(), "12");
        engine.undo();
        assert_eq!(engine.expression(), "123");
    }

    #[test]
    fn log_accumulates_in_order_and_reuses() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "1+1");
        engine.on_evaluate();
        type_keys(&mut engine, "2*3");
        engine.on_evaluate();

        let history = engine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "1+1 = 2");
        assert_eq!(history[1].text, "2*3 = 6");

        assert!(engine.reuse_log_entry(0));
        assert_eq!(engine.expression(), "1+1");
        assert_eq!(engine.status(), OperationStatus::Processing);
        assert!(!engine.reuse_log_entry(9));
    }

    #[test]
    fn clear_keeps_log_clear_all_drops_it() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "1+1");
        engine.on_evaluate();
        engine.on_clear();
        assert_eq!(engine.history().len(), 1);
        engine.on_clear_all();
        assert!(engine.history().is_empty());
        assert_eq!(engine.result(), "0");
    }

    #[test]
    fn division_by_zero_keeps_buffer() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "5/0");
        engine.on_evaluate();
        assert_eq!(engine.status(), OperationStatus::Error);
        assert_eq!(engine.result(), "Division by zero");
        assert_eq!(engine.expression(), "5/0");
        assert!(engine.history().is_empty());

        engine.set_locale("fr");
        assert!(engine.result().contains("zéro"));

        engine.on_clear();
        assert_eq!(engine.status(), OperationStatus::Ready);
    }

    #[test]
    fn overflowing_literal_is_an_error_not_a_result() {
        let mut engine = CalculatorEngine::default();
        let sink = CollectingSink::default();
        engine.set_record_sink(Box::new(sink.clone()));
        engine.set_expression("1e400");
        engine.on_evaluate();

        assert_eq!(engine.status(), OperationStatus::Error);
        assert_eq!(engine.last_error(), Some(&EvalError::Overflow));
        assert_eq!(engine.result(), "Overflow");
        assert!(engine.history().is_empty());
        assert!(sink.records.lock().unwrap().is_empty());

        engine.on_operator("+");
        assert!(!engine.expression().contains("Error"));
    }

    #[test]
    fn digit_after_result_starts_new_expression() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "2+2");
        engine.on_evaluate();
        engine.on_number("7");
        assert_eq!(engine.expression(), "7");
    }

    #[test]
    fn operator_after_result_continues_from_it() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "2+2");
        engine.on_evaluate();
        engine.on_operator("×");
        engine.on_number("3");
        assert_eq!(engine.expression(), "4*3");
        engine.on_evaluate();
        assert_eq!(engine.result(), "12");
    }

    #[test]
    fn operator_replacement_and_unary_sign() {
        let mut engine = CalculatorEngine::default();
        engine.on_operator("+");
        assert_eq!(engine.expression(), "");
        engine.on_operator("-");
        assert_eq!(engine.expression(), "-");
        engine.on_number("2");
        engine.on_operator("+");
        engine.on_operator("*");
        assert_eq!(engine.expression(), "-2*");
        engine.on_operator("-");
        assert_eq!(engine.expression(), "-2*-");
        engine.on_operator("+");
        assert_eq!(engine.expression(), "-2+");
    }

    #[test]
    fn decimal_rules() {
        let mut engine = CalculatorEngine::default();
        engine.on_decimal();
        assert_eq!(engine.expression(), "0.");
        engine.on_number("5");
        engine.on_decimal();
        assert_eq!(engine.expression(), "0.5");
        engine.on_operator("+");
        engine.on_number("1");
        engine.on_decimal();
        assert_eq!(engine.expression(), "0.5+1.");
    }

    #[test]
    fn right_paren_needs_open_group() {
        let mut engine = CalculatorEngine::default();
        engine.on_right_paren();
        assert_eq!(engine.expression(), "");
        engine.on_left_paren();
        engine.on_right_paren();
        assert_eq!(engine.expression(), "(");
        type_keys(&mut engine, "2+3)");
        assert_eq!(engine.expression(), "(2+3)");
        engine.on_right_paren();
        assert_eq!(engine.expression(), "(2+3)");
    }

    #[test]
    fn functions_and_constants() {
        let mut engine = CalculatorEngine::default();
        engine.on_function("sqrt");
        engine.on_number("9");
        engine.on_evaluate();
        assert_eq!(engine.result(), "3");

        engine.on_function("π");
        assert_eq!(engine.expression(), "pi");
        engine.on_function("bogus");
        assert_eq!(engine.expression(), "pi");
    }

    #[test]
    fn angle_mode_toggles_and_applies() {
        let mut engine = CalculatorEngine::default();
        engine.on_toggle_angle_mode();
        assert_eq!(engine.angle_mode(), AngleMode::Gradians);
        engine.on_toggle_angle_mode();
        assert_eq!(engine.angle_mode(), AngleMode::Degrees);
        engine.on_function("sin");
        type_keys(&mut engine, "90");
        engine.on_evaluate();
        assert_eq!(engine.result(), "1");
    }

    #[test]
    fn format_mode_rerenders_result() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "1000*1000");
        engine.on_evaluate();
        assert_eq!(engine.result(), "1000000");
        engine.set_format_mode(FormatMode::Thousands);
        assert_eq!(engine.result(), "1,000,000");
        engine.set_format_mode(FormatMode::Scientific);
        assert_eq!(engine.result(), "1E6");
    }

    #[test]
    fn length_limit_is_enforced() {
        let mut engine = CalculatorEngine::new(EngineConfig {
            max_expression_len: 3,
            ..EngineConfig::default()
        });
        type_keys(&mut engine, "12345");
        assert_eq!(engine.expression(), "123");
        engine.set_expression("987654");
        assert_eq!(engine.expression(), "987");
    }

    #[test]
    fn successful_evaluations_reach_sink() {
        let sink = CollectingSink::default();
        let mut engine = CalculatorEngine::default();
        engine.set_record_sink(Box::new(sink.clone()));
        type_keys(&mut engine, "6*7");
        engine.on_evaluate();
        type_keys(&mut engine, "1/0");
        engine.on_evaluate();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "6*7");
        assert_eq!(records[0].result, "42");
    }

    #[test]
    fn subscribers_see_changes() {
        let mut engine = CalculatorEngine::default();
        let rx = engine.subscribe();
        assert_eq!(rx.try_recv().map(|s| s.result), Ok("0".to_string()));

        engine.on_number("8");
        engine.on_evaluate();
        let updates: Vec<CalculatorSnapshot> = rx.try_iter().collect();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].expression, "8");
        assert_eq!(updates[1].result, "8");
        assert_eq!(updates[1].history().len(), 1);

        // no-op actions publish nothing
        engine.on_right_paren();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut engine = CalculatorEngine::default();
        drop(engine.subscribe());
        engine.on_number("1");
        assert!(engine.subscribers.is_empty());
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut engine = CalculatorEngine::default();
        type_keys(&mut engine, "9-4");
        engine.on_evaluate();
        engine.on_memory_store();
        let snapshot = engine.snapshot();

        let mut restored = CalculatorEngine::default();
        restored.restore(snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.memory_has_value());
        assert!(!restored.can_undo());
        restored.on_operator("+");
        assert_eq!(restored.expression(), "5+");
    }
}
