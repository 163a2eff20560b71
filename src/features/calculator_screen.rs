use crate::features::calculator::{CalculatorEngine, OperationStatus};
use crate::features::number_format::FormatMode;
use crate::state::AppState;
use crate::ui::{maybe_push_back, Button, Card, Column, Grid, Text};
use serde_json::Value;
use std::collections::HashMap;

pub const EXPRESSION_BINDING: &str = "calc_expr";

const KEYPAD: [(&str, &str); 20] = [
    ("7", "calc_digit:7"),
    ("8", "calc_digit:8"),
    ("9", "calc_digit:9"),
    ("÷", "calc_op:/"),
    ("⌫", "calc_delete"),
    ("4", "calc_digit:4"),
    ("5", "calc_digit:5"),
    ("6", "calc_digit:6"),
    ("×", "calc_op:*"),
    ("(", "calc_lparen"),
    ("1", "calc_digit:1"),
    ("2", "calc_digit:2"),
    ("3", "calc_digit:3"),
    ("−", "calc_op:-"),
    (")", "calc_rparen"),
    ("0", "calc_digit:0"),
    (".", "calc_decimal"),
    ("%", "calc_op:%"),
    ("+", "calc_op:+"),
    ("=", "calc_evaluate"),
];

const FUNCTION_KEYS: [(&str, &str); 21] = [
    ("sin", "calc_fn:sin"),
    ("cos", "calc_fn:cos"),
    ("tan", "calc_fn:tan"),
    ("asin", "calc_fn:asin"),
    ("acos", "calc_fn:acos"),
    ("atan", "calc_fn:atan"),
    ("sinh", "calc_fn:sinh"),
    ("cosh", "calc_fn:cosh"),
    ("tanh", "calc_fn:tanh"),
    ("asinh", "calc_fn:asinh"),
    ("acosh", "calc_fn:acosh"),
    ("atanh", "calc_fn:atanh"),
    ("ln", "calc_fn:ln"),
    ("log", "calc_fn:log"),
    ("√", "calc_fn:sqrt"),
    ("x^y", "calc_op:^"),
    ("n!", "calc_fn:fact"),
    ("|x|", "calc_fn:abs"),
    ("π", "calc_fn:pi"),
    ("e", "calc_fn:e"),
    ("C", "calc_clear"),
];

const MEMORY_KEYS: [(&str, &str); 5] = [
    ("MC", "calc_mem_clear"),
    ("MR", "calc_mem_recall"),
    ("M+", "calc_mem_plus"),
    ("M−", "calc_mem_minus"),
    ("MS", "calc_mem_store"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum CalcAction {
    Digit(String),
    Operator(String),
    Function(String),
    Decimal,
    LeftParen,
    RightParen,
    Delete,
    Clear,
    ClearAll,
    Evaluate,
    ToggleAngle,
    MemoryPlus,
    MemoryMinus,
    MemoryRecall,
    MemoryStore,
    MemoryClear,
    Undo,
    Redo,
    SetFormat(FormatMode),
    SetExpression(String),
    ReuseLog(usize),
    RemoveLog(usize),
    ClearLog,
}

/// `None` when `action` is not a calculator action at all.
pub fn parse_calc_action(
    action: &str,
    bindings: &HashMap<String, String>,
) -> Option<Result<CalcAction, String>> {
    let (name, arg) = match action.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (action, None),
    };
    let missing = || format!("missing_argument:{action}");
    let parsed = match name {
        "calc_digit" => arg.map(|d| CalcAction::Digit(d.to_string())).ok_or_else(missing),
        "calc_op" => arg.map(|op| CalcAction::Operator(op.to_string())).ok_or_else(missing),
        "calc_fn" => arg.map(|f| CalcAction::Function(f.to_string())).ok_or_else(missing),
        "calc_decimal" => Ok(CalcAction::Decimal),
        "calc_lparen" => Ok(CalcAction::LeftParen),
        "calc_rparen" => Ok(CalcAction::RightParen),
        "calc_delete" => Ok(CalcAction::Delete),
        "calc_clear" => Ok(CalcAction::Clear),
        "calc_clear_all" => Ok(CalcAction::ClearAll),
        "calc_evaluate" => Ok(CalcAction::Evaluate),
        "calc_angle" => Ok(CalcAction::ToggleAngle),
        "calc_mem_plus" => Ok(CalcAction::MemoryPlus),
        "calc_mem_minus" => Ok(CalcAction::MemoryMinus),
        "calc_mem_recall" => Ok(CalcAction::MemoryRecall),
        "calc_mem_store" => Ok(CalcAction::MemoryStore),
        "calc_mem_clear" => Ok(CalcAction::MemoryClear),
        "calc_undo" => Ok(CalcAction::Undo),
        "calc_redo" => Ok(CalcAction::Redo),
        "calc_format" => arg
            .ok_or_else(missing)
            .and_then(|raw| {
                FormatMode::parse(raw).ok_or_else(|| format!("invalid_format_mode:{raw}"))
            })
            .map(CalcAction::SetFormat),
        "calc_set_expression" => Ok(CalcAction::SetExpression(
            bindings.get(EXPRESSION_BINDING).cloned().unwrap_or_default(),
        )),
        "calc_log_reuse" => parse_index(action, arg).map(CalcAction::ReuseLog),
        "calc_log_remove" => parse_index(action, arg).map(CalcAction::RemoveLog),
        "calc_log_clear" => Ok(CalcAction::ClearLog),
        _ => return None,
    };
    Some(parsed)
}

fn parse_index(action: &str, arg: Option<&str>) -> Result<usize, String> {
    arg.and_then(|raw| raw.parse::<usize>().ok())
        .ok_or_else(|| format!("invalid_index:{action}"))
}

pub fn apply_calc_action(engine: &mut CalculatorEngine, action: CalcAction) {
    match action {
        CalcAction::Digit(d) => engine.on_number(&d),
        CalcAction::Operator(op) => engine.on_operator(&op),
        CalcAction::Function(name) => engine.on_function(&name),
        CalcAction::Decimal => engine.on_decimal(),
        CalcAction::LeftParen => engine.on_left_paren(),
        CalcAction::RightParen => engine.on_right_paren(),
        CalcAction::Delete => engine.on_delete(),
        CalcAction::Clear => engine.on_clear(),
        CalcAction::ClearAll => engine.on_clear_all(),
        CalcAction::Evaluate => engine.on_evaluate(),
        CalcAction::ToggleAngle => engine.on_toggle_angle_mode(),
        CalcAction::MemoryPlus => engine.on_memory_plus(),
        CalcAction::MemoryMinus => engine.on_memory_minus(),
        CalcAction::MemoryRecall => engine.on_memory_recall(),
        CalcAction::MemoryStore => engine.on_memory_store(),
        CalcAction::MemoryClear => engine.on_memory_clear(),
        CalcAction::Undo => engine.undo(),
        CalcAction::Redo => engine.redo(),
        CalcAction::SetFormat(mode) => engine.set_format_mode(mode),
        CalcAction::SetExpression(text) => engine.set_expression(&text),
        CalcAction::ReuseLog(index) => {
            if !engine.reuse_log_entry(index) {
                log::debug!("no log entry at {index}");
            }
        }
        CalcAction::RemoveLog(index) => {
            engine.remove_log_entry(index);
        }
        CalcAction::ClearLog => engine.clear_log(),
    }
}

fn key_grid(keys: &[(&str, &str)], columns: u32) -> Value {
    let buttons = keys
        .iter()
        .map(|(label, action)| serde_json::to_value(Button::new(label, action)).unwrap())
        .collect();
    serde_json::to_value(Grid::new(buttons).columns(columns)).unwrap()
}

pub fn render_calculator_screen(state: &AppState) -> Value {
    let engine = &state.engine;
    let title = rust_i18n::t!("calculator.title", locale = &state.locale);
    let expression = if engine.expression().is_empty() { " " } else { engine.expression() };
    let result_cd = match engine.status() {
        OperationStatus::Error => "calc_error",
        _ => "calc_result",
    };

    let mut children = vec![
        serde_json::to_value(Text::new(&title).size(20.0)).unwrap(),
        serde_json::to_value(Text::new(expression).size(22.0).content_description("calc_expression"))
            .unwrap(),
        serde_json::to_value(Text::new(engine.result()).size(32.0).content_description(result_cd))
            .unwrap(),
    ];

    let indicator = rust_i18n::t!("calculator.memory_indicator", locale = &state.locale);
    let mut status_row = vec![
        serde_json::to_value(Button::new(engine.angle_mode().label(), "calc_angle")).unwrap(),
    ];
    if engine.memory_has_value() {
        status_row.push(
            serde_json::to_value(Text::new(&indicator).content_description("memory_indicator")).unwrap(),
        );
    }
    status_row.push(serde_json::to_value(Button::new("↶", "calc_undo").enabled(engine.can_undo())).unwrap());
    status_row.push(serde_json::to_value(Button::new("↷", "calc_redo").enabled(engine.can_redo())).unwrap());
    children.push(serde_json::to_value(Grid::new(status_row).columns(4)).unwrap());

    if let Some(err) = &state.last_error {
        children.push(serde_json::to_value(Text::new(err).content_description("error")).unwrap());
    }

    children.push(key_grid(&MEMORY_KEYS, 5));
    children.push(key_grid(&FUNCTION_KEYS, 6));
    children.push(key_grid(&KEYPAD, 5));

    let formats: Vec<Value> = [FormatMode::Plain, FormatMode::Thousands, FormatMode::Scientific]
        .into_iter()
        .map(|mode| {
            let action = format!("calc_format:{}", mode.as_str());
            let label = match mode {
                FormatMode::Plain => "123",
                FormatMode::Thousands => "1,234",
                FormatMode::Scientific => "1E3",
            };
            serde_json::to_value(Button::new(label, &action).enabled(engine.format_mode() != mode)).unwrap()
        })
        .collect();
    children.push(serde_json::to_value(Grid::new(formats).columns(3)).unwrap());

    children.push(render_log(state));
    let history = rust_i18n::t!("history.title", locale = &state.locale);
    let settings = rust_i18n::t!("settings.title", locale = &state.locale);
    children.push(
        serde_json::to_value(Grid::new(vec![
            serde_json::to_value(Button::new(&history, "history_screen")).unwrap(),
            serde_json::to_value(Button::new(&settings, "settings_screen")).unwrap(),
        ]).columns(2))
        .unwrap(),
    );

    maybe_push_back(&mut children, state);
    serde_json::to_value(Column::new(children).padding(16)).unwrap()
}

fn render_log(state: &AppState) -> Value {
    let title = rust_i18n::t!("calculator.history", locale = &state.locale);
    let lines = state.engine.history();
    let mut rows = Vec::new();
    if lines.is_empty() {
        let empty = rust_i18n::t!("calculator.history_empty", locale = &state.locale);
        rows.push(serde_json::to_value(Text::new(&empty).size(12.0)).unwrap());
    }
    // newest first
    for (index, line) in lines.iter().enumerate().rev() {
        let reuse = format!("calc_log_reuse:{index}");
        let remove = format!("calc_log_remove:{index}");
        rows.push(
            serde_json::to_value(Grid::new(vec![
                serde_json::to_value(Button::new(&line.text, &reuse)).unwrap(),
                serde_json::to_value(Button::new("✕", &remove)).unwrap(),
            ]).columns(2))
            .unwrap(),
        );
    }
    if !lines.is_empty() {
        let clear = rust_i18n::t!("calculator.clear_log", locale = &state.locale);
        rows.push(serde_json::to_value(Button::new(&clear, "calc_log_clear")).unwrap());
    }
    serde_json::to_value(Card::new(rows).title(&title).padding(8)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::evaluator::is_function_name;

    fn parse(action: &str) -> Result<CalcAction, String> {
        parse_calc_action(action, &HashMap::new()).expect("calculator action")
    }

    #[test]
    fn parses_argument_actions() {
        assert_eq!(parse("calc_digit:7"), Ok(CalcAction::Digit("7".into())));
        assert_eq!(parse("calc_op:^"), Ok(CalcAction::Operator("^".into())));
        assert_eq!(parse("calc_fn:sin"), Ok(CalcAction::Function("sin".into())));
        assert_eq!(parse("calc_format:scientific"), Ok(CalcAction::SetFormat(FormatMode::Scientific)));
        assert_eq!(parse("calc_log_reuse:3"), Ok(CalcAction::ReuseLog(3)));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(parse("calc_digit"), Err("missing_argument:calc_digit".into()));
        assert_eq!(parse("calc_format:roman"), Err("invalid_format_mode:roman".into()));
        assert_eq!(parse("calc_log_remove:x"), Err("invalid_index:calc_log_remove:x".into()));
        assert!(parse_calc_action("history_screen", &HashMap::new()).is_none());
    }

    #[test]
    fn set_expression_reads_binding() {
        let mut bindings = HashMap::new();
        bindings.insert(EXPRESSION_BINDING.to_string(), "2^10".to_string());
        let action = parse_calc_action("calc_set_expression", &bindings).unwrap().unwrap();
        let mut engine = CalculatorEngine::default();
        apply_calc_action(&mut engine, action);
        apply_calc_action(&mut engine, CalcAction::Evaluate);
        assert_eq!(engine.result(), "1024");
    }

    #[test]
    fn every_key_parses() {
        for (_, action) in KEYPAD.iter().chain(FUNCTION_KEYS.iter()).chain(MEMORY_KEYS.iter()) {
            assert!(matches!(parse_calc_action(action, &HashMap::new()), Some(Ok(_))), "{action}");
        }
    }

    #[test]
    fn function_keys_cover_every_function() {
        let names = [
            "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "asinh", "acosh",
            "atanh", "ln", "log", "sqrt", "abs", "fact",
        ];
        for name in names {
            assert!(is_function_name(name), "{name}");
            let action = format!("calc_fn:{name}");
            assert!(FUNCTION_KEYS.iter().any(|(_, a)| *a == action), "no key for {name}");
        }
    }
}
