//! Output formatting for CLI commands
//!
//! Provides utilities for formatting command output in human-readable
//! form. Supports colored output (respects NO_COLOR env var).

/// Color scheme for CLI output
pub mod colors {
    use colored::{ColoredString, Colorize};

    /// Style for labels/headers
    pub fn label(s: &str) -> ColoredString {
        s.bold()
    }

    /// Style for corpus IDs
    pub fn corpus_id(s: &str) -> ColoredString {
        s.cyan()
    }

    /// Style for feature and algorithm names
    pub fn feature(s: &str) -> ColoredString {
        s.magenta()
    }

    /// Style for file paths
    pub fn file_path(s: &str) -> ColoredString {
        s.blue()
    }

    /// Style for numbers/counts
    pub fn number(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for success messages
    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    /// Style for warning messages
    pub fn warning(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for dim/secondary text
    pub fn dim(s: &str) -> ColoredString {
        s.dimmed()
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs >= 60.0 {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs - (mins * 60.0);
        format!("{mins:.0}m {remaining_secs:.1}s")
    } else if secs >= 1.0 {
        format!("{secs:.2}s")
    } else {
        let ms = secs * 1000.0;
        format!("{ms:.0}ms")
    }
}

/// Short description of a mapping fragment (`keyword`, `object`, ...)
pub fn mapping_kind(mapping: &serde_json::Value) -> String {
    if mapping.get("enabled") == Some(&serde_json::Value::Bool(false)) {
        return "stored only".to_string();
    }
    if let Some(kind) = mapping.get("type").and_then(|t| t.as_str()) {
        return kind.to_string();
    }
    match mapping.get("properties").and_then(|p| p.as_object()) {
        Some(fields) => format!("object ({} fields)", fields.len()),
        None => "object".to_string(),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{}", colors::success(message));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{}: {}", colors::warning("Warning"), message);
}

/// Print a header/title
pub fn print_header(title: &str) {
    println!("{}", colors::label(title));
}
