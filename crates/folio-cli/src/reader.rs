//! Terminal reading loop
//!
//! Drives a [`ReaderSession`] over the plain-text engine. Reads one command
//! per input line and waits out the scroll-restore grace delay on the same
//! single-threaded runtime.
//!
//! ## Commands
//!
//! - n / p: Next / previous chapter
//! - j [N] / k [N]: Scroll down / up (a page by default)
//! - e N TEXT: Replace paragraph N on screen (it is rewritten again)
//! - h: Back to the catalog
//! - q: Quit
//! - ?: Help

use std::rc::Rc;
use std::time::Instant;

use anyhow::Result;
use tokio::io::{AsyncBufRead, Lines};
use tracing::{debug, info};

use folio_core::{CatalogEntry, Config, PositionTracker, ReaderSession, RenderingEngine, SessionOptions, Step};

use crate::engine::TextEngine;

/// A parsed reader command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderCommand {
    Next,
    Previous,
    /// Scroll down by the given lines, or a page
    Down(Option<u32>),
    Up(Option<u32>),
    Edit { paragraph: usize, text: String },
    Home,
    Quit,
    Help,
    Unknown(String),
}

impl ReaderCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "" | "j" => ReaderCommand::Down(rest.parse().ok()),
            "n" => ReaderCommand::Next,
            "p" => ReaderCommand::Previous,
            "k" => ReaderCommand::Up(rest.parse().ok()),
            "h" => ReaderCommand::Home,
            "q" => ReaderCommand::Quit,
            "?" => ReaderCommand::Help,
            "e" => {
                let (index, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match index.parse() {
                    Ok(paragraph) if !text.trim().is_empty() => ReaderCommand::Edit {
                        paragraph,
                        text: text.trim().to_string(),
                    },
                    _ => ReaderCommand::Unknown(line.to_string()),
                }
            }
            _ => ReaderCommand::Unknown(line.to_string()),
        }
    }
}

/// How a reading visit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Home,
    Quit,
}

/// Read `entry` from `engine` until the reader goes home or quits
///
/// The tracker is handed back for the next visit; the session tier is
/// left alone.
pub async fn run<R>(
    config: &Config,
    entry: &CatalogEntry,
    engine: TextEngine,
    tracker: PositionTracker,
    input: &mut Lines<R>,
) -> Result<(Exit, PositionTracker)>
where
    R: AsyncBufRead + Unpin,
{
    let rules = Rc::new(config.rule_set()?);
    let options = SessionOptions {
        restore_grace: config.restore_grace(),
        theme: config.theme.clone(),
    };
    let page = i64::from(config.page_lines.max(1));

    info!("Reading {} ({} tier)", entry.id, tracker.tier());
    let mut session = ReaderSession::open(entry.id.clone(), engine, tracker, rules, options);
    session.pump(Instant::now());
    draw(entry, &session);

    let exit = loop {
        let deadline = session.next_deadline();

        tokio::select! {
            biased;

            // Scroll restore becomes due
            _ = async {
                match deadline {
                    Some(due) => tokio::time::sleep_until(tokio::time::Instant::from_std(due)).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                let now = Instant::now();
                if session.tick(now) {
                    session.pump(now);
                    draw(entry, &session);
                }
            }

            line = input.next_line() => {
                // EOF quits like `q`
                let Some(line) = line? else {
                    break Exit::Quit;
                };

                let command = ReaderCommand::parse(&line);
                debug!("Reader command: {:?}", command);
                match command {
                    ReaderCommand::Next => {
                        if session.next() == Step::Boundary {
                            println!("(last chapter)");
                        }
                    }
                    ReaderCommand::Previous => {
                        if session.previous() == Step::Boundary {
                            println!("(first chapter)");
                        }
                    }
                    ReaderCommand::Down(count) => {
                        let delta = count.map(i64::from).unwrap_or(page);
                        session.engine_mut().scroll_by(delta);
                    }
                    ReaderCommand::Up(count) => {
                        let delta = count.map(i64::from).unwrap_or(page);
                        session.engine_mut().scroll_by(-delta);
                    }
                    ReaderCommand::Edit { paragraph, text } => {
                        if let Err(e) = session.engine().edit_paragraph(paragraph, &text) {
                            println!("{}", e);
                            continue;
                        }
                    }
                    ReaderCommand::Home => {
                        session.go_home();
                        break Exit::Home;
                    }
                    ReaderCommand::Quit => break Exit::Quit,
                    ReaderCommand::Help => {
                        print_help();
                        continue;
                    }
                    ReaderCommand::Unknown(typed) => {
                        println!("Unknown command: {:?} (? for help)", typed);
                        continue;
                    }
                }

                session.pump(Instant::now());
                draw(entry, &session);
            }
        }
    };

    Ok((exit, session.close()))
}

fn draw(entry: &CatalogEntry, session: &ReaderSession<TextEngine>) {
    let engine = session.engine();
    let location = engine
        .current_location()
        .map(|l| l.to_string())
        .unwrap_or_default();
    let title = engine.chapter_title().unwrap_or("");

    println!();
    println!("── {} · {} {} ──", entry.name, location, title);
    for line in engine.visible_lines() {
        println!("{}", line);
    }
    println!("── line {} ──", engine.scroll_offset() + 1);
}

fn print_help() {
    println!("n: next chapter   p: previous chapter");
    println!("j [N]: scroll down   k [N]: scroll up");
    println!("e N TEXT: replace paragraph N");
    println!("h: catalog   q: quit");
}
