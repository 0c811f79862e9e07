//! Console output for commands
//!
//! Commands report through an [`OutputFormatter`]: decorated text for people,
//! or one JSON document per result with `--json`. Formatters write to a
//! [`Console`], which is stdout/stderr in the binary and a buffer in tests.

#[cfg(test)]
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Destination of formatted text
#[derive(Clone, Default)]
pub enum Console {
    #[default]
    Std,
    #[cfg(test)]
    Captured(Arc<Mutex<Captured>>),
}

/// Text written to a capturing console
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Captured {
    pub out: Vec<String>,
    pub err: Vec<String>,
}

impl Console {
    /// A console that records instead of printing
    #[cfg(test)]
    pub fn capture() -> (Self, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        (Console::Captured(captured.clone()), captured)
    }

    fn out(&self, text: &str) {
        match self {
            Console::Std => println!("{text}"),
            #[cfg(test)]
            Console::Captured(c) => c.lock().unwrap().out.push(text.to_string()),
        }
    }

    fn err(&self, text: &str) {
        match self {
            Console::Std => eprintln!("{text}"),
            #[cfg(test)]
            Console::Captured(c) => c.lock().unwrap().err.push(text.to_string()),
        }
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &Value);
    /// Reports a command result: `lines` as text, `value` as JSON
    fn result(&self, lines: &[String], value: &Value);
}

/// Human-readable output with status marks
#[derive(Default)]
pub struct HumanFormatter {
    console: Console,
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        self.console.out(&format!("\u{2713} {message}"));
    }
    fn error(&self, message: &str) {
        self.console.err(&format!("\u{2717} Error: {message}"));
    }
    fn warn(&self, message: &str) {
        self.console.err(&format!("\u{26a0} Warning: {message}"));
    }
    fn info(&self, message: &str) {
        self.console.out(&format!("  {message}"));
    }
    fn print_json(&self, _value: &Value) {}
    fn result(&self, lines: &[String], _value: &Value) {
        for line in lines {
            self.console.out(line);
        }
    }
}

/// JSON output, one document per event
#[derive(Default)]
pub struct JsonFormatter {
    console: Console,
}

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        self.console
            .out(&serde_json::json!({"success": true, "message": message}).to_string());
    }
    fn error(&self, message: &str) {
        self.console
            .err(&serde_json::json!({"success": false, "error": message}).to_string());
    }
    fn warn(&self, message: &str) {
        self.console
            .err(&serde_json::json!({"level": "warning", "message": message}).to_string());
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &Value) {
        self.console
            .out(&serde_json::to_string_pretty(value).unwrap_or_default());
    }
    fn result(&self, _lines: &[String], value: &Value) {
        self.print_json(value);
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    formatter_on(format, Console::Std)
}

/// A formatter for `format` writing to `console`
pub fn formatter_on(format: OutputFormat, console: Console) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter { console }),
        OutputFormat::Human => Box::new(HumanFormatter { console }),
    }
}
