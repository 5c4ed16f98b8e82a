//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use notelink_core::export::{ExportReport, UnitOutcome};
use notelink_core::store::NoteSummary;
use notelink_core::OutlineNode;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the notes of the library, with their sync destination if any
    pub fn print_notes(&self, notes: &[(NoteSummary, Option<String>)]) {
        match self.format {
            OutputFormat::Human => {
                if notes.is_empty() {
                    println!("No notes found.");
                    return;
                }
                for (note, synced) in notes {
                    let sync_indicator = synced
                        .as_ref()
                        .map(|path| format!(" -> {}", path))
                        .unwrap_or_default();
                    println!(
                        "{:>5} | {} | {} [{}]{}",
                        note.id,
                        note.key,
                        truncate(&note.title, 40),
                        note.line_count,
                        sync_indicator
                    );
                }
                println!("\n{} note(s)", notes.len());
            }
            OutputFormat::Json => {
                let json_notes: Vec<_> = notes
                    .iter()
                    .map(|(note, synced)| {
                        serde_json::json!({
                            "id": note.id,
                            "key": note.key,
                            "title": note.title,
                            "line_count": note.line_count,
                            "synced_to": synced,
                        })
                    })
                    .collect();
                print_json(&json_notes);
            }
            OutputFormat::Quiet => {
                for (note, _) in notes {
                    println!("{}", note.id);
                }
            }
        }
    }

    /// Print the heading tree of a note
    pub fn print_outline(&self, title: &str, outline: &[OutlineNode]) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", title);
                if outline.is_empty() {
                    println!("  (no headings)");
                }
                for node in outline {
                    print_outline_node(node, 1);
                }
            }
            OutputFormat::Json => print_json(&outline),
            OutputFormat::Quiet => {
                for node in notelink_core::outline::flatten(outline) {
                    println!("{}", node.line_index);
                }
            }
        }
    }

    /// Print the outcome of an export or sync
    pub fn print_report(&self, report: &ExportReport) {
        match self.format {
            OutputFormat::Human => {
                if report.is_empty() {
                    println!("Nothing to export.");
                    return;
                }
                for outcome in &report.outcomes {
                    match outcome {
                        UnitOutcome::Written { note, path } => {
                            println!("✓ {:>5} -> {}", note, path.display())
                        }
                        UnitOutcome::Delivered { note, kind } => {
                            println!("✓ {:>5} -> {} (delivered by renderer)", note, kind)
                        }
                        UnitOutcome::Skipped { note, reason } => {
                            println!("- {:>5} skipped: {}", note, reason)
                        }
                        UnitOutcome::Failed {
                            note,
                            kind,
                            message,
                        } => println!("✗ {:>5} {}: {}", note, kind.as_str(), message),
                    }
                }
                for miss in &report.misses {
                    println!(
                        "⚠ note {} line {}: link target not found ({})",
                        miss.source, miss.line_index, miss.uri
                    );
                }
                if let Some(kept) = report.kept_note {
                    println!("Resolved copy kept as note {}", kept);
                }
                for retained in &report.retained {
                    println!("Temporary note {} retained", retained);
                }
                println!(
                    "\n{} written, {} failed",
                    report.written().len(),
                    report.failures().len()
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for path in report.written() {
                    println!("{}", path.display());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn print_outline_node(node: &OutlineNode, depth: usize) {
    println!(
        "{}{} (line {})",
        "  ".repeat(depth),
        node.name,
        node.line_index
    );
    for child in &node.children {
        print_outline_node(child, depth + 1);
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ünïcödé títlé", 8), "ünïcö...");
    }
}
