//! Structured output layer.
//!
//! Every user-facing line goes through `emit`: text mode renders colored
//! lines with a level icon, JSON mode prints one machine-readable event
//! per line so the output stays pipeable. The renderer is global and
//! configured once from the CLI flags.

use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn icon(self) -> &'static str {
        match self {
            Level::Info => "·",
            Level::Success => "✓",
            Level::Warn => "!",
            Level::Error => "✗",
            Level::Debug => "»",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
    pub debug: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
            debug: false,
        }
    }
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer::default());
}

pub fn init(format: OutputFormat, color: bool, debug: bool) {
    if let Ok(mut renderer) = RENDERER.write() {
        renderer.format = format;
        renderer.color = color;
        renderer.debug = debug;
    }
}

pub fn is_debug_enabled() -> bool {
    RENDERER.read().map(|r| r.debug).unwrap_or(false)
}

pub fn get_output_format() -> OutputFormat {
    RENDERER
        .read()
        .map(|r| r.format)
        .unwrap_or(OutputFormat::Text)
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, line: &str, enable: bool) -> String {
    if !enable {
        return line.to_string();
    }
    match level {
        Level::Info => line.normal().to_string(),
        Level::Success => line.green().bold().to_string(),
        Level::Warn => line.yellow().bold().to_string(),
        Level::Error => line.red().bold().to_string(),
        Level::Debug => line.cyan().to_string(),
    }
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    let renderer = match RENDERER.read() {
        Ok(renderer) => renderer.clone(),
        Err(_) => return,
    };

    if matches!(level, Level::Debug) && !renderer.debug {
        return;
    }

    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };

    match renderer.format {
        OutputFormat::Text => {
            // Data-only events have nothing to say in text mode.
            if message.is_empty() {
                return;
            }
            let line = format!("{} {}", level.icon(), message);
            let _ = writeln!(out, "{}", colorize(level, &line, renderer.color));
        }
        OutputFormat::Json => {
            let event = Event {
                level: level.as_str(),
                code,
                message,
                data,
            };
            if let Ok(line) = serde_json::to_string(&event) {
                let _ = writeln!(out, "{}", line);
            }
        }
    }
}

pub fn info(code: &str, message: &str) {
    emit(Level::Info, code, message, None)
}
pub fn success(code: &str, message: &str) {
    emit(Level::Success, code, message, None)
}
pub fn warn(code: &str, message: &str) {
    emit(Level::Warn, code, message, None)
}
pub fn error(code: &str, message: &str) {
    emit(Level::Error, code, message, None)
}
pub fn error_with_data(code: &str, message: &str, data: serde_json::Value) {
    emit(Level::Error, code, message, Some(data))
}
pub fn debug(code: &str, message: &str) {
    emit(Level::Debug, code, message, None)
}

/// Structured payload with no prose, for JSON consumers.
pub fn data(code: &str, data: serde_json::Value) {
    emit(Level::Info, code, "", Some(data))
}

pub fn separator() {
    let renderer = match RENDERER.read() {
        Ok(renderer) => renderer.clone(),
        Err(_) => return,
    };
    // Separators would corrupt JSON streams.
    if matches!(renderer.format, OutputFormat::Json) {
        return;
    }
    println!("{}", "─".repeat(64));
}

pub mod prelude {
    pub use super::{
        Level, OutputFormat, data, debug, emit, error, error_with_data, get_output_format, info,
        is_debug_enabled, separator, success, warn,
    };
}
