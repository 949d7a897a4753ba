use crate::engine::{fibonacci, ExpressionEngine};
use crate::error::{CalcError, Result};
use crate::logging::LogControl;
use crate::store;
use std::path::PathBuf;
use tracing::debug;

pub const MAX_DIGITS: usize = 17;

const HELP: &str = "\
<expression>       evaluate, e.g. (1+2)*ans or 2^-3
:rpn <tokens>      evaluate postfix tokens, e.g. :rpn 3 4 + 2 *
:fib <n>           nth Fibonacci number
:save <name>       store the last answer as a variable
:load <name>       make a variable the last answer
:undo              go back to the previous answer
:clear             reset the answer and history
:vars              list variables
:store [path]      write variables to a file
:restore [path]    read variables from a file
:digits <n>        digits shown in results
:debug             toggle debug logging
Press enter on an empty line to exit.";

#[derive(Debug, PartialEq)]
pub enum Reply {
    Value(f64),
    Message(String),
}

/// Turns input lines into engine calls.
pub struct Dispatcher {
    engine: ExpressionEngine,
    file: PathBuf,
    digits: usize,
    log: LogControl,
}

impl Dispatcher {
    pub fn new(file: PathBuf, digits: usize, log: LogControl) -> Dispatcher {
        Dispatcher {
            engine: ExpressionEngine::new(),
            file,
            digits: digits.clamp(1, MAX_DIGITS),
            log,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Merges the default variable file into the engine.
    pub fn restore(&mut self, path: Option<&str>) -> Result<Reply> {
        let path = path.map_or_else(|| self.file.clone(), PathBuf::from);
        let taken = self.engine.merge_variables(store::load(&path)?);
        Ok(Reply::Message(format!(
            "Loaded {} variables from {}.",
            taken,
            path.display()
        )))
    }

    pub fn dispatch(&mut self, line: &str) -> Result<Reply> {
        let line = line.trim();
        debug!("Processing input: '{}'", line);
        let Some(command) = line.strip_prefix(':') else {
            return self.engine.evaluate(line).map(Reply::Value);
        };

        let (name, args) = command
            .trim_start()
            .split_once(char::is_whitespace)
            .map_or((command.trim_start(), ""), |(name, args)| (name, args.trim()));

        match name.to_ascii_lowercase().as_str() {
            "rpn" => {
                let tokens: Vec<&str> = args.split_whitespace().collect();
                self.engine.evaluate_rpn(&tokens).map(Reply::Value)
            }
            "fib" => {
                let n: i64 = args
                    .parse()
                    .map_err(|_| CalcError::invalid("Usage: :fib <integer>"))?;
                Ok(Reply::Value(fibonacci(n)))
            }
            "save" => {
                let value = self.engine.save_variable(args)?;
                Ok(Reply::Message(format!("Saved {} = {}", args, value)))
            }
            "load" => self.engine.load_variable(args).map(Reply::Value),
            "undo" => {
                if self.engine.undo() {
                    Ok(Reply::Value(self.engine.last_answer()))
                } else {
                    Ok(Reply::Message("Nothing to undo.".to_string()))
                }
            }
            "clear" => {
                self.engine.clear_state();
                Ok(Reply::Message("State cleared.".to_string()))
            }
            "vars" => Ok(Reply::Message(self.engine.list_variables())),
            "store" => {
                let path = if args.is_empty() {
                    self.file.clone()
                } else {
                    PathBuf::from(args)
                };
                store::save(self.engine.variables(), &path)?;
                Ok(Reply::Message(format!(
                    "Saved {} variables to {}.",
                    self.engine.variables().len(),
                    path.display()
                )))
            }
            "restore" => self.restore((!args.is_empty()).then_some(args)),
            "digits" => {
                let digits = args
                    .parse::<usize>()
                    .ok()
                    .filter(|d| (1..=MAX_DIGITS).contains(d))
                    .ok_or_else(|| {
                        CalcError::invalid(format!("Usage: :digits <1-{}>", MAX_DIGITS))
                    })?;
                self.digits = digits;
                Ok(Reply::Message(format!("Precision set to {} digits.", digits)))
            }
            "debug" => {
                let enabled = self.log.toggle_debug();
                Ok(Reply::Message(format!(
                    "Debug {}",
                    if enabled { "enabled" } else { "disabled" }
                )))
            }
            "help" => Ok(Reply::Message(HELP.to_string())),
            _ => Err(CalcError::invalid("Unknown command!")),
        }
    }
}
