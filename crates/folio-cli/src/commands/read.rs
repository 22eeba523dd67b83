//! Read command handler
//!
//! Reading and the catalog alternate in one process: `h` in the reader
//! lists the catalog and asks for the next document. The position store
//! lives for the whole run, so session-tier positions survive trips home
//! and are cleared only on exit.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

use folio_core::{CatalogEntry, Config, DocumentId, PositionTracker, Route, Tier, TieredStore};

use crate::engine::TextEngine;
use crate::output::Output;
use crate::reader::{self, Exit};

/// Open a document, going home to the catalog for unknown ids
pub async fn read(config: &Config, id: String, session_only: bool, output: &Output) -> Result<()> {
    let tier = if session_only { Tier::Session } else { config.tier };
    let tracker = PositionTracker::new(TieredStore::open(config.positions_path())?, tier);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut tracker = browse(config, DocumentId::new(id), tracker, &mut input, output).await?;
    tracker.end_session();
    Ok(())
}

/// Alternate between reading and the catalog until the reader quits
pub async fn browse<R>(
    config: &Config,
    first: DocumentId,
    mut tracker: PositionTracker,
    input: &mut Lines<R>,
    output: &Output,
) -> Result<PositionTracker>
where
    R: AsyncBufRead + Unpin,
{
    let catalog = config.catalog();
    let mut id = first;

    loop {
        match catalog.resolve(&id) {
            Route::Read(entry) => {
                let path = document_path(config, &entry);
                match TextEngine::load(&path, config.page_lines) {
                    Ok(engine) => {
                        let (exit, back) = reader::run(config, &entry, engine, tracker, input).await?;
                        tracker = back;
                        if exit == Exit::Quit {
                            return Ok(tracker);
                        }
                    }
                    Err(e) => {
                        warn!("Could not open {}: {:#}", entry.id, e);
                        output.message(&format!("Could not open {} ({}): {:#}", entry.name, entry.id, e));
                    }
                }
            }
            Route::Home => output.message(&format!("Unknown document '{}'.", id)),
        }

        output.print_catalog(catalog.entries());
        match choose_document(input, output).await? {
            Some(next) => id = next,
            None => return Ok(tracker),
        }
    }
}

/// Ask for the next document id; `None` on `q` or end of input
async fn choose_document<R>(input: &mut Lines<R>, output: &Output) -> Result<Option<DocumentId>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        output.message("Document to open (q to quit):");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match line.trim() {
            "" => continue,
            "q" => return Ok(None),
            id => return Ok(Some(DocumentId::new(id))),
        }
    }
}

/// File holding the plain-text rendition of `entry`
///
/// Catalog paths are rooted at the data directory unless they name an
/// existing file. A container path maps to the `.txt` file next to it.
pub fn document_path(config: &Config, entry: &CatalogEntry) -> PathBuf {
    let declared = Path::new(&entry.path);
    let mut path = if declared.is_absolute() && declared.exists() {
        declared.to_path_buf()
    } else {
        config.data_dir.join(entry.path.trim_start_matches('/'))
    };

    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
    {
        path.set_extension("txt");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use folio_core::{Location, ReadingPosition};
    use tempfile::TempDir;

    const VOLUME: &str = "# Bab 1\n\nSatu.\n\nDua.\n\nTiga.\n\nEmpat.\n\n# Bab 2\n\nLima.\n";

    fn config(data_dir: &Path) -> Config {
        Config {
            data_dir: data_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_container_maps_to_text_rendition() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        let entry = CatalogEntry::new("y0v0", "Year 0 Volume 0", "/COTE-Y0V0.epub");

        assert_eq!(
            document_path(&config, &entry),
            temp_dir.path().join("COTE-Y0V0.txt")
        );
    }

    #[test]
    fn test_existing_absolute_path_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("buku.txt");
        std::fs::write(&file, "isi").unwrap();
        let config = config(Path::new("/nonexistent"));
        let entry = CatalogEntry::new("buku", "Buku", file.to_string_lossy());

        assert_eq!(document_path(&config, &entry), file);
    }

    fn reading_config(data_dir: &Path, tier: Tier) -> Config {
        std::fs::write(data_dir.join("COTE-Y0V0.txt"), VOLUME).unwrap();
        Config {
            data_dir: data_dir.to_path_buf(),
            restore_grace_ms: 0,
            page_lines: 2,
            tier,
            ..Config::default()
        }
    }

    async fn browse_with(config: &Config, script: &'static str) -> PositionTracker {
        let tracker = PositionTracker::new(TieredStore::open(config.positions_path()).unwrap(), config.tier);
        let mut input = BufReader::new(script.as_bytes()).lines();
        let output = Output::new(OutputFormat::Quiet);
        browse(config, DocumentId::from("y0v0"), tracker, &mut input, &output)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_position_survives_going_home() {
        let temp_dir = TempDir::new().unwrap();
        let config = reading_config(temp_dir.path(), Tier::Session);

        // Scroll, go home, reopen, then end of input. Had the second visit
        // started at the top, leaving it would have saved offset 0.
        let mut tracker = browse_with(&config, "j 3\nh\ny0v0\n").await;

        let id = DocumentId::from("y0v0");
        assert_eq!(
            tracker.restore(&id),
            Some(ReadingPosition::new(Location::new("chapter-1"), 3))
        );

        tracker.end_session();
        assert!(tracker.restore(&id).is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_then_quit() {
        let temp_dir = TempDir::new().unwrap();
        let config = reading_config(temp_dir.path(), Tier::Durable);
        let tracker = PositionTracker::new(TieredStore::in_memory(), Tier::Durable);
        let mut input = BufReader::new("\nq\n".as_bytes()).lines();
        let output = Output::new(OutputFormat::Quiet);

        let tracker = browse(&config, DocumentId::from("y9v9"), tracker, &mut input, &output)
            .await
            .unwrap();
        assert!(tracker.restore(&DocumentId::from("y0v0")).is_none());
    }

    #[tokio::test]
    async fn test_quit_keeps_durable_position() {
        let temp_dir = TempDir::new().unwrap();
        let config = reading_config(temp_dir.path(), Tier::Durable);

        browse_with(&config, "n\nq\n").await;

        let reopened = PositionTracker::new(TieredStore::open(config.positions_path()).unwrap(), Tier::Durable);
        assert_eq!(
            reopened.restore(&DocumentId::from("y0v0")),
            Some(ReadingPosition::at_top(Location::new("chapter-2")))
        );
    }
}
