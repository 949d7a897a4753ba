//! The calculator state: variables, the last answer and its undo history.
//!
//! [`ExpressionEngine`] is driven by the command dispatcher one call at a time.
//! A failed call never changes state.

use crate::error::{CalcError, Result};
use crate::expr;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Most answers kept for undo, including the floor entry.
pub const HISTORY_LIMIT: usize = 100;

/// Token that stands for the last answer inside expressions.
pub const ANSWER_TOKEN: &str = "ans";

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();
static WORD_PATTERN: OnceLock<Regex> = OnceLock::new();

pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN
        .get_or_init(|| Regex::new(r"^[a-z]+$").expect("name pattern is valid"))
        .is_match(name)
}

fn words() -> &'static Regex {
    WORD_PATTERN.get_or_init(|| Regex::new(r"[A-Za-z]+").expect("word pattern is valid"))
}

/// Stack of previous answers. Never empty: the bottom entry is the floor undo stops at.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: VecDeque<f64>,
}

impl History {
    pub fn new() -> History {
        History {
            entries: VecDeque::from([0.0]),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.entries.len() == HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    /// Drops the top entry and returns the new top, or `None` at the floor.
    pub fn pop(&mut self) -> Option<f64> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop_back();
        self.entries.back().copied()
    }

    pub fn top(&self) -> f64 {
        self.entries.back().copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}

#[derive(Debug, Default)]
pub struct ExpressionEngine {
    variables: BTreeMap<String, f64>,
    last_answer: f64,
    history: History,
}

impl ExpressionEngine {
    pub fn new() -> ExpressionEngine {
        ExpressionEngine::default()
    }

    pub fn last_answer(&self) -> f64 {
        self.last_answer
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn variables(&self) -> &BTreeMap<String, f64> {
        &self.variables
    }

    /// Evaluates an infix expression, substituting `ans` and stored variables first.
    ///
    /// Input containing `^` must be exactly `base^exponent` and is computed by
    /// integer exponentiation, with the exponent truncated toward zero.
    pub fn evaluate(&mut self, expression: &str) -> Result<f64> {
        let stripped: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        let substituted = self.substitute(&stripped)?;
        debug!("Substituted '{}' into '{}'", stripped, substituted);

        let result = if substituted.contains('^') {
            power(&substituted)?
        } else {
            expr::evaluate(&substituted)?
        };

        self.record(result);
        Ok(result)
    }

    /// Replaces every alphabetic word by its value, `ans` taking precedence over variables.
    ///
    /// A word written against a number or a bracket (`2x`, `x(1)`, `(1)x`) is rejected.
    fn substitute(&self, expression: &str) -> Result<String> {
        let mut output = String::with_capacity(expression.len());
        let mut last = 0;
        for word in words().find_iter(expression) {
            let before = expression[..word.start()].chars().next_back();
            let after = expression[word.end()..].chars().next();
            let joined_before = before.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ')');
            let joined_after = after.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '(');
            if joined_before || joined_after {
                return Err(CalcError::invalid("Expected operator!"));
            }
            let value = if word.as_str() == ANSWER_TOKEN {
                self.last_answer
            } else if let Some(&value) = self.variables.get(word.as_str()) {
                value
            } else {
                return Err(CalcError::invalid(format!(
                    "Unknown identifier '{}'",
                    word.as_str()
                )));
            };
            output.push_str(&expression[last..word.start()]);
            output.push_str(&value.to_string());
            last = word.end();
        }
        output.push_str(&expression[last..]);
        Ok(output)
    }

    /// Evaluates postfix tokens. Operators pop `b` then `a` and push `a op b`.
    pub fn evaluate_rpn<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<f64> {
        let mut stack: Vec<f64> = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            if let Ok(number) = token.parse::<f64>() {
                if !number.is_finite() {
                    return Err(CalcError::UnsupportedOperator(token.to_string()));
                }
                stack.push(number);
                continue;
            }
            let op = match token {
                "+" | "-" | "*" | "/" | "^" => token.chars().next().unwrap_or_default(),
                _ => return Err(CalcError::UnsupportedOperator(token.to_string())),
            };
            let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                return Err(CalcError::StackUnderflow(token.to_string()));
            };
            stack.push(expr::binary(op, a, b)?);
            debug!("RPN stack: {:?}", stack);
        }

        let Some(&result) = stack.last() else {
            return Err(CalcError::StackUnderflow("empty input".to_string()));
        };
        if !result.is_finite() {
            return Err(CalcError::invalid("Result is not a finite number"));
        }
        self.record(result);
        Ok(result)
    }

    /// Stores the last answer under `name`.
    pub fn save_variable(&mut self, name: &str) -> Result<f64> {
        if !is_valid_name(name) {
            return Err(CalcError::InvalidName(name.to_string()));
        }
        self.variables.insert(name.to_string(), self.last_answer);
        debug!("Saved {} = {}", name, self.last_answer);
        Ok(self.last_answer)
    }

    /// Makes a stored variable the last answer.
    pub fn load_variable(&mut self, name: &str) -> Result<f64> {
        if !is_valid_name(name) {
            return Err(CalcError::InvalidName(name.to_string()));
        }
        let value = *self
            .variables
            .get(name)
            .ok_or_else(|| CalcError::VariableNotFound(name.to_string()))?;
        self.record(value);
        Ok(value)
    }

    /// Restores the previous answer. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.last_answer = previous;
                debug!("Undo, answer is now {}", previous);
                true
            }
            None => false,
        }
    }

    /// Resets the answer and history. Variables are kept.
    pub fn clear_state(&mut self) {
        self.last_answer = 0.0;
        self.history = History::new();
        debug!("State cleared");
    }

    pub fn list_variables(&self) -> String {
        if self.variables.is_empty() {
            return "No variables stored.".to_string();
        }
        self.variables
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces the whole variable table, e.g. with one read from a file.
    pub fn replace_variables(&mut self, variables: BTreeMap<String, f64>) -> usize {
        self.variables.clear();
        self.merge_variables(variables)
    }

    /// Adds or overwrites variables, skipping bad names and non-finite values.
    /// Returns how many were taken.
    pub fn merge_variables(&mut self, variables: BTreeMap<String, f64>) -> usize {
        let mut taken = 0;
        for (name, value) in variables {
            if !is_valid_name(&name) || !value.is_finite() {
                warn!("Skipping variable '{}' = {}", name, value);
                continue;
            }
            self.variables.insert(name, value);
            taken += 1;
        }
        taken
    }

    fn record(&mut self, value: f64) {
        self.history.push(value);
        self.last_answer = value;
        debug!("Answer is now {} ({} in history)", value, self.history.len());
    }
}

/// Computes `base^exponent` for text split on a single `^`.
fn power(expression: &str) -> Result<f64> {
    let syntax_error = || CalcError::InvalidExponentSyntax(expression.to_string());
    let mut parts = expression.split('^');
    let (Some(base), Some(exponent), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(syntax_error());
    };
    let base: f64 = base.parse().map_err(|_| syntax_error())?;
    let exponent: f64 = exponent.parse().map_err(|_| syntax_error())?;
    if !base.is_finite() || !exponent.is_finite() {
        return Err(syntax_error());
    }

    // Saturates for exponents beyond i64, which overflow to infinity or zero anyway
    let exponent = exponent.trunc() as i64;
    let magnitude = integer_power(base, exponent.unsigned_abs());
    let result = if exponent < 0 {
        if base == 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        1.0 / magnitude
    } else {
        magnitude
    };

    if !result.is_finite() {
        return Err(CalcError::invalid("Result is not a finite number"));
    }
    Ok(result)
}

/// Repeated multiplication, by squaring so large exponents stay fast.
fn integer_power(mut base: f64, mut exponent: u64) -> f64 {
    let mut result = 1.0;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result *= base;
        }
        base *= base;
        exponent >>= 1;
    }
    result
}

/// The nth Fibonacci number, with `fibonacci(0) == 0` and `fibonacci(1) == 1`.
/// Indices below 2 are returned as they are. Past index 1476 the result is infinite.
pub fn fibonacci(n: i64) -> f64 {
    if n <= 1 {
        return n as f64;
    }
    let (mut previous, mut current) = (0.0_f64, 1.0_f64);
    for _ in 2..=n {
        let next = previous + current;
        previous = current;
        current = next;
        if current.is_infinite() {
            break;
        }
    }
    current
}
