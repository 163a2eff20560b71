use serde::{Deserialize, Serialize};

/// Single-register memory (M+, M-, MR, MC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCell {
    value: f64,
    has_value: bool,
}

impl MemoryCell {
    pub const fn new() -> Self {
        Self {
            value: 0.0,
            has_value: false,
        }
    }

    pub fn add(&mut self, amount: f64) {
        self.value += amount;
        self.has_value = true;
    }

    pub fn subtract(&mut self, amount: f64) {
        self.value -= amount;
        self.has_value = true;
    }

    pub fn store(&mut self, value: f64) {
        self.value = value;
        self.has_value = true;
    }

    pub fn recall(&self) -> Option<f64> {
        self.has_value.then_some(self.value)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn has_value(&self) -> bool {
        self.has_value
    }
}
