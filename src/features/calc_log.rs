use crate::features::evaluator::AngleMode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// One successful evaluation. Never mutated after being logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub expression: String,
    pub result: String,
    pub value: f64,
    pub timestamp_ms: i64,
    pub angle_mode: AngleMode,
}

impl LogEntry {
    pub fn display(&self) -> LogEntryDisplay {
        LogEntryDisplay {
            text: format!("{} = {}", self.expression, self.result),
            expression: self.expression.clone(),
            result: self.result.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntryDisplay {
    pub text: String,
    pub expression: String,
    pub result: String,
}

/// Evaluated results in insertion order, oldest dropped first.
#[derive(Debug, Clone)]
pub struct CalcLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for CalcLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl CalcLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<LogEntry> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn display_lines(&self) -> Vec<LogEntryDisplay> {
        self.entries.iter().map(LogEntry::display).collect()
    }

    /// Rebuild from a snapshot, keeping only the newest entries that fit.
    pub fn restore(&mut self, entries: Vec<LogEntry>) {
        self.entries.clear();
        for entry in entries {
            self.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expression: &str, result: &str) -> LogEntry {
        LogEntry {
            expression: expression.into(),
            result: result.into(),
            value: result.parse().unwrap_or_default(),
            timestamp_ms: 0,
            angle_mode: AngleMode::Radians,
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let mut log = CalcLog::default();
        log.push(entry("1+1", "2"));
        log.push(entry("3*3", "9"));
        let lines: Vec<String> = log.display_lines().into_iter().map(|d| d.text).collect();
        assert_eq!(lines, vec!["1+1 = 2", "3*3 = 9"]);
    }

    #[test]
    fn drops_oldest_past_capacity() {
        let mut log = CalcLog::with_capacity(2);
        log.push(entry("1", "1"));
        log.push(entry("2", "2"));
        log.push(entry("3", "3"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).map(|e| e.expression.as_str()), Some("2"));
    }

    #[test]
    fn remove_and_clear() {
        let mut log = CalcLog::default();
        log.push(entry("1", "1"));
        log.push(entry("2", "2"));
        assert_eq!(log.remove(0).map(|e| e.expression), Some("1".to_string()));
        assert_eq!(log.remove(5), None);
        log.clear();
        assert!(log.is_empty());
    }
}
