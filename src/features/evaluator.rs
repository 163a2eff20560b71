use serde::{Deserialize, Serialize};
use std::f64::consts::{E, PI};
use thiserror::Error;

/// Names accepted by `on_function` that expand to a bare constant instead of a call.
pub const CONSTANTS: [&str; 2] = ["pi", "e"];

const FACTORIAL_LIMIT: f64 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AngleMode {
    Degrees,
    #[default]
    Radians,
    Gradians,
}

impl AngleMode {
    /// DEGREES -> RADIANS -> GRADIANS -> DEGREES
    pub fn next(self) -> Self {
        match self {
            AngleMode::Degrees => AngleMode::Radians,
            AngleMode::Radians => AngleMode::Gradians,
            AngleMode::Gradians => AngleMode::Degrees,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AngleMode::Degrees => "DEG",
            AngleMode::Radians => "RAD",
            AngleMode::Gradians => "GRAD",
        }
    }

    fn to_radians(self, angle: f64) -> f64 {
        match self {
            AngleMode::Degrees => angle.to_radians(),
            AngleMode::Radians => angle,
            AngleMode::Gradians => angle * PI / 200.0,
        }
    }

    fn from_radians(self, radians: f64) -> f64 {
        match self {
            AngleMode::Degrees => radians.to_degrees(),
            AngleMode::Radians => radians,
            AngleMode::Gradians => radians * 200.0 / PI,
        }
    }

    // Radians has no exact representation of a quarter turn, so only the
    // decimal units can detect the tangent poles exactly.
    fn quarter_turn(self) -> Option<f64> {
        match self {
            AngleMode::Degrees => Some(90.0),
            AngleMode::Gradians => Some(100.0),
            AngleMode::Radians => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("domain error: {0}")]
    Domain(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("overflow")]
    Overflow,
}

impl EvalError {
    fn syntax(detail: impl Into<String>) -> Self {
        Self::Syntax(detail.into())
    }

    fn domain(detail: impl Into<String>) -> Self {
        Self::Domain(detail.into())
    }

    /// Stable identifier used for logs and diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::Syntax(_) => "syntax_error",
            EvalError::Domain(_) => "domain_error",
            EvalError::DivisionByZero => "division_by_zero",
            EvalError::Overflow => "overflow",
        }
    }
}

pub fn is_function_name(name: &str) -> bool {
    Function::from_name(name).is_some()
}

/// Evaluate `expression`, closing any unbalanced `(` at the end first.
pub fn evaluate(expression: &str, angle_mode: AngleMode) -> Result<f64, EvalError> {
    let balanced = balance_parentheses(expression)?;
    let tokens = tokenize(&balanced)?;
    let rpn = shunting_yard(&tokens)?;
    let value = eval_rpn(&rpn, angle_mode)?;
    // -0.0 must never reach the display
    Ok(if value == 0.0 { 0.0 } else { value })
}

fn balance_parentheses(expression: &str) -> Result<String, EvalError> {
    let open = expression.chars().filter(|c| *c == '(').count();
    let close = expression.chars().filter(|c| *c == ')').count();
    if close > open {
        return Err(EvalError::syntax("mismatched_parentheses"));
    }
    let mut out = String::with_capacity(expression.len() + open - close);
    out.push_str(expression);
    out.extend(std::iter::repeat(')').take(open - close));
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div | Operator::Mod => 2,
            Operator::Pow => 3,
            Operator::Neg => 4,
        }
    }

    fn assoc(self) -> Assoc {
        match self {
            Operator::Pow | Operator::Neg => Assoc::Right,
            _ => Assoc::Left,
        }
    }

    fn arity(self) -> usize {
        match self {
            Operator::Neg => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Ln,
    Log,
    Sqrt,
    Abs,
    Fact,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "asinh" => Function::Asinh,
            "acosh" => Function::Acosh,
            "atanh" => Function::Atanh,
            "ln" => Function::Ln,
            "log" => Function::Log,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            "fact" => Function::Fact,
            _ => return None,
        };
        Some(func)
    }

    fn apply(self, arg: f64, angle_mode: AngleMode) -> Result<f64, EvalError> {
        let value = match self {
            Function::Sin => angle_mode.to_radians(arg).sin(),
            Function::Cos => angle_mode.to_radians(arg).cos(),
            Function::Tan => {
                if let Some(quarter) = angle_mode.quarter_turn() {
                    let turns = arg / quarter;
                    if turns.fract() == 0.0 && turns.rem_euclid(2.0) == 1.0 {
                        return Err(EvalError::domain("tan_undefined"));
                    }
                }
                angle_mode.to_radians(arg).tan()
            }
            Function::Asin => {
                if !(-1.0..=1.0).contains(&arg) {
                    return Err(EvalError::domain("asin_out_of_range"));
                }
                angle_mode.from_radians(arg.asin())
            }
            Function::Acos => {
                if !(-1.0..=1.0).contains(&arg) {
                    return Err(EvalError::domain("acos_out_of_range"));
                }
                angle_mode.from_radians(arg.acos())
            }
            Function::Atan => angle_mode.from_radians(arg.atan()),
            Function::Sinh => arg.sinh(),
            Function::Cosh => arg.cosh(),
            Function::Tanh => arg.tanh(),
            Function::Asinh => arg.asinh(),
            Function::Acosh => {
                if arg < 1.0 {
                    return Err(EvalError::domain("acosh_below_one"));
                }
                arg.acosh()
            }
            Function::Atanh => {
                if arg.abs() >= 1.0 {
                    return Err(EvalError::domain("atanh_out_of_range"));
                }
                arg.atanh()
            }
            Function::Ln => {
                if arg <= 0.0 {
                    return Err(EvalError::domain("ln_non_positive"));
                }
                arg.ln()
            }
            Function::Log => {
                if arg <= 0.0 {
                    return Err(EvalError::domain("log_non_positive"));
                }
                arg.log10()
            }
            Function::Sqrt => {
                if arg < 0.0 {
                    return Err(EvalError::domain("sqrt_of_negative"));
                }
                arg.sqrt()
            }
            Function::Abs => arg.abs(),
            Function::Fact => factorial(arg)?,
        };
        check_finite(value)
    }
}

fn factorial(n: f64) -> Result<f64, EvalError> {
    if n < 0.0 || n.fract() != 0.0 {
        return Err(EvalError::domain("factorial_requires_non_negative_integer"));
    }
    if n > FACTORIAL_LIMIT {
        return Err(EvalError::Overflow);
    }
    Ok((2..=n as u32).fold(1.0, |acc, k| acc * f64::from(k)))
}

fn check_finite(value: f64) -> Result<f64, EvalError> {
    if value.is_nan() {
        Err(EvalError::domain("undefined_result"))
    } else if value.is_infinite() {
        Err(EvalError::Overflow)
    } else {
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Operator(Operator),
    Function(Function),
    LeftParen,
    RightParen,
}

#[derive(Debug, Clone)]
enum RpnToken {
    Number(f64),
    Operator(Operator),
    Function(Function),
}

/// Tokenizes and checks adjacency in one pass: a binary operator needs a
/// value on its left and a function name must be followed by `(`. An operand
/// directly after a value multiplies it (`2pi`, `2sin(0)`, `(2)(3)`), except
/// that two number literals may not touch.
fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut prev_is_value = false;
    let mut prev_is_literal = false;
    let mut awaiting_call = false;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        if ch.is_whitespace() {
            idx += 1;
            continue;
        }
        if awaiting_call && ch != '(' {
            return Err(EvalError::syntax("function_requires_parentheses"));
        }
        let after_literal = std::mem::take(&mut prev_is_literal);

        match ch {
            c if c.is_ascii_digit() || c == '.' => {
                if after_literal {
                    return Err(EvalError::syntax("missing_operator"));
                }
                let (number, next) = parse_number(&chars, idx)?;
                push_operand(&mut tokens, Token::Number(number), prev_is_value);
                prev_is_value = true;
                prev_is_literal = true;
                idx = next;
            }
            c if c.is_ascii_alphabetic() => {
                let (ident, next) = parse_identifier(&chars, idx);
                let lowered = ident.to_ascii_lowercase();
                idx = next;
                match lowered.as_str() {
                    "pi" => {
                        push_operand(&mut tokens, Token::Number(PI), prev_is_value);
                        prev_is_value = true;
                    }
                    "e" => {
                        push_operand(&mut tokens, Token::Number(E), prev_is_value);
                        prev_is_value = true;
                    }
                    name => {
                        let func = Function::from_name(name)
                            .ok_or_else(|| EvalError::syntax(format!("unknown_identifier:{name}")))?;
                        push_operand(&mut tokens, Token::Function(func), prev_is_value);
                        prev_is_value = false;
                        awaiting_call = true;
                    }
                }
            }
            'π' => {
                push_operand(&mut tokens, Token::Number(PI), prev_is_value);
                prev_is_value = true;
                idx += 1;
            }
            '√' => {
                push_operand(&mut tokens, Token::Function(Function::Sqrt), prev_is_value);
                prev_is_value = false;
                awaiting_call = true;
                idx += 1;
            }
            '+' => {
                if prev_is_value {
                    tokens.push(Token::Operator(Operator::Add));
                }
                prev_is_value = false;
                idx += 1;
            }
            '-' | '−' => {
                let op = if prev_is_value {
                    Operator::Sub
                } else {
                    Operator::Neg
                };
                tokens.push(Token::Operator(op));
                prev_is_value = false;
                idx += 1;
            }
            '*' | '×' | '/' | '÷' | '%' | '^' => {
                if !prev_is_value {
                    return Err(EvalError::syntax(format!("missing_operand_before:{ch}")));
                }
                let op = match ch {
                    '*' | '×' => Operator::Mul,
                    '/' | '÷' => Operator::Div,
                    '%' => Operator::Mod,
                    _ => Operator::Pow,
                };
                tokens.push(Token::Operator(op));
                prev_is_value = false;
                idx += 1;
            }
            '(' => {
                push_operand(&mut tokens, Token::LeftParen, prev_is_value);
                prev_is_value = false;
                awaiting_call = false;
                idx += 1;
            }
            ')' => {
                if !prev_is_value {
                    return Err(EvalError::syntax("empty_operand"));
                }
                tokens.push(Token::RightParen);
                prev_is_value = true;
                idx += 1;
            }
            other => {
                return Err(EvalError::syntax(format!("unexpected_char:{other}")));
            }
        }
    }

    if tokens.is_empty() {
        return Err(EvalError::syntax("empty_expression"));
    }
    if awaiting_call || !prev_is_value {
        return Err(EvalError::syntax("missing_operand"));
    }
    Ok(tokens)
}

fn push_operand(tokens: &mut Vec<Token>, token: Token, prev_is_value: bool) {
    if prev_is_value {
        tokens.push(Token::Operator(Operator::Mul));
    }
    tokens.push(token);
}

fn parse_number(chars: &[char], start: usize) -> Result<(f64, usize), EvalError> {
    let mut idx = start;
    let mut buf = String::new();

    while idx < chars.len() && (chars[idx].is_ascii_digit() || chars[idx] == '.') {
        buf.push(chars[idx]);
        idx += 1;
    }

    // `e` is only an exponent marker when digits follow; otherwise it is Euler's number.
    if idx < chars.len() && (chars[idx] == 'e' || chars[idx] == 'E') {
        let digit_at = |i: usize| chars.get(i).is_some_and(|c| c.is_ascii_digit());
        let signed = matches!(chars.get(idx + 1), Some('+') | Some('-'));
        let exp_digits_at = if signed { idx + 2 } else { idx + 1 };
        if digit_at(exp_digits_at) {
            buf.push('e');
            if signed {
                buf.push(chars[idx + 1]);
            }
            idx = exp_digits_at;
            while idx < chars.len() && chars[idx].is_ascii_digit() {
                buf.push(chars[idx]);
                idx += 1;
            }
        }
    }

    let value = buf
        .parse::<f64>()
        .map_err(|_| EvalError::syntax(format!("invalid_number:{buf}")))?;
    Ok((check_finite(value)?, idx))
}

fn parse_identifier(chars: &[char], start: usize) -> (String, usize) {
    let mut idx = start;
    let mut buf = String::new();
    while idx < chars.len() && (chars[idx].is_ascii_alphanumeric() || chars[idx] == '_') {
        buf.push(chars[idx]);
        idx += 1;
    }
    (buf, idx)
}

fn shunting_yard(tokens: &[Token]) -> Result<Vec<RpnToken>, EvalError> {
    let mut output: Vec<RpnToken> = Vec::new();
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(n) => output.push(RpnToken::Number(*n)),
            Token::Function(func) => stack.push(Token::Function(*func)),
            Token::Operator(op) => {
                // Prefix negation binds to what follows; it never pops.
                if *op != Operator::Neg {
                    while let Some(Token::Operator(top_op)) = stack.last() {
                        let top_op = *top_op;
                        let pops = top_op.precedence() > op.precedence()
                            || (top_op.precedence() == op.precedence() && op.assoc() == Assoc::Left);
                        if !pops {
                            break;
                        }
                        stack.pop();
                        output.push(RpnToken::Operator(top_op));
                    }
                }
                stack.push(Token::Operator(*op));
            }
            Token::LeftParen => stack.push(Token::LeftParen),
            Token::RightParen => {
                let mut matched = false;
                while let Some(top) = stack.pop() {
                    match top {
                        Token::LeftParen => {
                            matched = true;
                            break;
                        }
                        Token::Operator(o) => output.push(RpnToken::Operator(o)),
                        Token::Function(func) => output.push(RpnToken::Function(func)),
                        _ => {}
                    }
                }
                if !matched {
                    return Err(EvalError::syntax("mismatched_parentheses"));
                }
                if let Some(Token::Function(func)) = stack.last() {
                    output.push(RpnToken::Function(*func));
                    stack.pop();
                }
            }
        }
    }

    while let Some(top) = stack.pop() {
        match top {
            Token::LeftParen | Token::RightParen => {
                return Err(EvalError::syntax("mismatched_parentheses"))
            }
            Token::Operator(o) => output.push(RpnToken::Operator(o)),
            Token::Function(func) => output.push(RpnToken::Function(func)),
            Token::Number(_) => return Err(EvalError::syntax("invalid_expression")),
        }
    }

    Ok(output)
}

fn eval_rpn(tokens: &[RpnToken], angle_mode: AngleMode) -> Result<f64, EvalError> {
    let mut stack: Vec<f64> = Vec::new();
    for token in tokens {
        match token {
            RpnToken::Number(n) => stack.push(*n),
            RpnToken::Operator(op) => {
                if stack.len() < op.arity() {
                    return Err(EvalError::syntax("missing_operand"));
                }
                let result = if *op == Operator::Neg {
                    let a = stack.pop().unwrap_or_default();
                    -a
                } else {
                    let (b, a) = pop_two(&mut stack)?;
                    apply_binary(*op, a, b)?
                };
                stack.push(check_finite(result)?);
            }
            RpnToken::Function(func) => {
                let Some(arg) = stack.pop() else {
                    return Err(EvalError::syntax("missing_operand"));
                };
                stack.push(func.apply(arg, angle_mode)?);
            }
        }
    }

    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err(EvalError::syntax("invalid_expression")),
    }
}

fn apply_binary(op: Operator, a: f64, b: f64) -> Result<f64, EvalError> {
    let value = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        Operator::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a % b
        }
        Operator::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a.powf(b)
        }
        Operator::Neg => -b,
    };
    Ok(value)
}

fn pop_two(stack: &mut Vec<f64>) -> Result<(f64, f64), EvalError> {
    let b = stack.pop().ok_or_else(|| EvalError::syntax("missing_operand"))?;
    let a = stack.pop().ok_or_else(|| EvalError::syntax("missing_operand"))?;
    Ok((b, a))
}
