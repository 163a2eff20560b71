pub mod calc_log;
pub mod calculator;
pub mod calculator_screen;
pub mod diagnostics;
pub mod edit_history;
pub mod evaluator;
pub mod history_screen;
pub mod history_store;
pub mod memory;
pub mod number_format;
pub mod persistence;
pub mod preferences;
pub mod result_cache;
pub mod storage;
