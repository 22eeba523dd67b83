//! How commands print
//!
//! `--json` gives one JSON object per result, `--quiet` only the bare
//! values a script would want.

use folio_core::{CatalogEntry, DocumentId, ReadingPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    /// Bare values only
    Quiet,
}

impl OutputFormat {
    /// `--quiet` wins over `--json`
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

pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the catalog (the home screen)
    pub fn print_catalog(&self, entries: &[CatalogEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No documents configured.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{:<8} | {} | {}",
                        entry.id.as_str(),
                        truncate(&entry.name, 35),
                        truncate(&entry.path, 45)
                    );
                }
                println!("\n{} document(s)", entries.len());
                println!("Open one with: folio read <id>");
            }
            OutputFormat::Json => {
                println!("{}", to_json(&entries));
            }
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print the saved position of a document
    pub fn print_position(&self, id: &DocumentId, position: Option<&ReadingPosition>) {
        match self.format {
            OutputFormat::Human => match position {
                Some(position) => {
                    println!("Document: {}", id);
                    println!("Location: {}", position.location);
                    println!("Scroll:   {}", position.scroll_offset);
                }
                None => println!("No saved position for {}.", id),
            },
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"document": id, "position": position})
                );
            }
            OutputFormat::Quiet => {
                if let Some(position) = position {
                    println!("{} {}", position.location, position.scroll_offset);
                }
            }
        }
    }

    /// Print rewritten text
    ///
    /// The text itself is the output in every format except JSON.
    pub fn print_rewrite(&self, text: &str, changed: bool) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"text": text, "changed": changed}));
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                print!("{}", text);
                if !text.ends_with('\n') {
                    println!();
                }
            }
        }
    }

    /// Confirm a change
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

    /// A notice that is not the command's result
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

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Cut to `max_len` chars, ending in "..." when cut
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
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
        assert_eq!(truncate("Tahun 0 — Jilid 0 edisi", 10), "Tahun 0...");
    }

    #[test]
    fn test_catalog_json_shape() {
        let entries = vec![CatalogEntry::new("y0v0", "Year 0 Volume 0", "/COTE-Y0V0.epub")];
        let json: serde_json::Value = serde_json::from_str(&to_json(&entries[..])).unwrap();
        assert_eq!(json[0]["id"], "y0v0");
        assert_eq!(json[0]["path"], "/COTE-Y0V0.epub");
    }
}
