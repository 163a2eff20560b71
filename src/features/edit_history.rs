use std::collections::VecDeque;

pub const DEFAULT_EDIT_CAPACITY: usize = 50;

/// Undo/redo snapshots of the expression buffer.
///
/// Both stacks are bounded; pushing past the cap silently drops the oldest
/// snapshot. Recording a new edit always invalidates the redo stack.
#[derive(Debug, Clone)]
pub struct EditHistory {
    undo: VecDeque<String>,
    redo: VecDeque<String>,
    capacity: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EDIT_CAPACITY)
    }
}

impl EditHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Remember the buffer as it was before an edit.
    pub fn record(&mut self, previous: String) {
        push_bounded(&mut self.undo, previous, self.capacity);
        self.redo.clear();
    }

    /// Returns the buffer to restore, stashing `current` for redo.
    pub fn undo(&mut self, current: String) -> Option<String> {
        let previous = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current, self.capacity);
        Some(previous)
    }

    pub fn redo(&mut self, current: String) -> Option<String> {
        let next = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current, self.capacity);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<String>, value: String, capacity: usize) {
    stack.push_back(value);
    while stack.len() > capacity {
        stack.pop_front();
    }
}
