use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Breadcrumb,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEvent {
    pub timestamp_ms: i64,
    pub level: DiagnosticLevel,
    pub category: String,
    pub message: String,
}

struct DiagnosticBuffer {
    events: VecDeque<DiagnosticEvent>,
    capacity: usize,
    enabled: bool,
}

/// Crash/diagnostic report buffer.
///
/// Built once by the service and shared by `Arc` with whoever reports into it,
/// including the persistence worker thread.
pub struct Diagnostics {
    inner: Mutex<DiagnosticBuffer>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(DiagnosticBuffer {
                events: VecDeque::new(),
                capacity: capacity.max(1),
                enabled: true,
            }),
        }
    }

    // A panic while holding the lock must not disable reporting.
    fn lock(&self) -> MutexGuard<'_, DiagnosticBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, level: DiagnosticLevel, category: &str, message: &str) {
        match level {
            DiagnosticLevel::Breadcrumb => log::debug!("[{category}] {message}"),
            DiagnosticLevel::Warn => log::warn!("[{category}] {message}"),
            DiagnosticLevel::Error => log::error!("[{category}] {message}"),
        }

        let mut buffer = self.lock();
        if !buffer.enabled {
            return;
        }
        buffer.events.push_back(DiagnosticEvent {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            level,
            category: category.to_string(),
            message: message.to_string(),
        });
        while buffer.events.len() > buffer.capacity {
            buffer.events.pop_front();
        }
    }

    pub fn record_error(&self, category: &str, message: &str) {
        self.record(DiagnosticLevel::Error, category, message);
    }

    /// Breadcrumb for the action that preceded a failure.
    pub fn record_action(&self, action: &str, screen: Option<&str>) {
        let message = match screen {
            Some(screen) => format!("{action} on {screen}"),
            None => action.to_string(),
        };
        self.record(DiagnosticLevel::Breadcrumb, "user_action", &message);
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut buffer = self.lock();
        buffer.enabled = enabled;
        if !enabled {
            buffer.events.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }
}
