//! Plain-text rendering engine
//!
//! A small [`RenderingEngine`] for the terminal. Documents are plain-text
//! renditions: a line starting with `# ` opens a chapter, blank lines
//! separate paragraphs. One chapter is rendered at a time as
//! `<body><h1>title</h1><p>...</p>...</body>`, and the scroll offset counts
//! wrapped lines of that view.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use folio_core::{
    ContentTree, ContentUnit, EngineEvent, Location, NodeKind, RenderingEngine, Step, TextTree, Theme, UnitId,
};

const LOCATION_PREFIX: &str = "chapter-";

/// Column at which paragraphs are wrapped
const WRAP_WIDTH: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chapter {
    title: Option<String>,
    paragraphs: Vec<String>,
}

pub struct TextEngine {
    chapters: Vec<Chapter>,
    current: Option<usize>,
    rendered: Option<ContentUnit>,
    next_unit: u64,
    scroll: u32,
    page_lines: u32,
    events: VecDeque<EngineEvent>,
    theme: Option<Theme>,
}

impl TextEngine {
    /// Load a plain-text rendition from disk
    pub fn load(path: &Path, page_lines: u32) -> Result<Self> {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
        {
            bail!(
                "EPUB containers are not supported: {:?}\n\
                 Provide a plain-text rendition (.txt) instead.",
                path
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {:?}", path))?;
        Ok(Self::from_text(&content, page_lines))
    }

    pub fn from_text(content: &str, page_lines: u32) -> Self {
        Self {
            chapters: parse_chapters(content),
            current: None,
            rendered: None,
            next_unit: 1,
            scroll: 0,
            page_lines: page_lines.max(1),
            events: VecDeque::new(),
            theme: None,
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    /// Title of the current chapter, if it has one
    pub fn chapter_title(&self) -> Option<&str> {
        self.current
            .and_then(|i| self.chapters.get(i))
            .and_then(|c| c.title.as_deref())
    }

    /// Scroll by `delta` lines, as the reader would
    pub fn scroll_by(&mut self, delta: i64) {
        let target = (i64::from(self.scroll) + delta).max(0);
        let target = u32::try_from(target).unwrap_or(u32::MAX);
        let clamped = target.min(self.max_scroll());
        if clamped != self.scroll {
            self.scroll = clamped;
            self.events.push_back(EngineEvent::Scrolled);
        }
    }

    /// Replace the text of paragraph `index` (1-based) in the rendered view
    ///
    /// Stands in for anything else that edits rendered content after
    /// layout, such as a page translator.
    pub fn edit_paragraph(&self, index: usize, text: &str) -> Result<()> {
        let Some(unit) = &self.rendered else {
            bail!("Nothing is rendered");
        };
        let paragraphs = paragraph_nodes(&unit.tree, unit.root);
        let Some(&paragraph) = index.checked_sub(1).and_then(|i| paragraphs.get(i)) else {
            bail!(
                "No paragraph {} in this chapter (1-{})",
                index,
                paragraphs.len()
            );
        };

        let tree = &unit.tree;
        match tree.children(paragraph).first() {
            Some(&text_node) => tree.set_text(text_node, text)?,
            None => {
                let text_node = tree.create_text(text);
                tree.append_child(paragraph, text_node)?;
            }
        }
        Ok(())
    }

    /// Every wrapped line of the rendered chapter
    pub fn view_lines(&self) -> Vec<String> {
        let Some(unit) = &self.rendered else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        for block in unit.tree.children(unit.root) {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            let text = unit.tree.text_content(block);
            match unit.tree.kind(block) {
                Some(NodeKind::Element(tag)) if tag == "h1" => lines.push(format!("# {}", text)),
                _ => lines.extend(wrap(&text, WRAP_WIDTH)),
            }
        }
        lines
    }

    /// Lines currently on screen
    pub fn visible_lines(&self) -> Vec<String> {
        self.view_lines()
            .into_iter()
            .skip(self.scroll as usize)
            .take(self.page_lines as usize)
            .collect()
    }

    fn max_scroll(&self) -> u32 {
        let total = u32::try_from(self.view_lines().len()).unwrap_or(u32::MAX);
        total.saturating_sub(self.page_lines)
    }

    fn show(&mut self, index: usize) {
        if let Some(old) = self.rendered.take() {
            self.events.push_back(EngineEvent::ContentUnloaded(old.id));
        }

        let unit = ContentUnit::new(UnitId(self.next_unit), render(&self.chapters[index]));
        self.next_unit += 1;
        debug!("Rendered chapter {} as unit {:?}", index + 1, unit.id);

        self.current = Some(index);
        self.scroll = 0;
        self.rendered = Some(unit.clone());
        self.events.push_back(EngineEvent::ContentReady(unit));
        self.events
            .push_back(EngineEvent::LocationChanged(location_of(index)));
    }
}

impl RenderingEngine for TextEngine {
    fn display(&mut self, location: Option<&Location>) {
        let index = location
            .and_then(|l| chapter_index(l, self.chapters.len()))
            .unwrap_or(0);
        self.show(index);
    }

    fn current_location(&self) -> Option<Location> {
        self.current.map(location_of)
    }

    fn current_contents(&self) -> Vec<ContentUnit> {
        self.rendered.iter().cloned().collect()
    }

    fn go_next(&mut self) -> Step {
        match self.current {
            Some(i) if i + 1 < self.chapters.len() => {
                self.show(i + 1);
                Step::Moved
            }
            _ => Step::Boundary,
        }
    }

    fn go_prev(&mut self) -> Step {
        match self.current {
            Some(i) if i > 0 => {
                self.show(i - 1);
                Step::Moved
            }
            _ => Step::Boundary,
        }
    }

    fn scroll_offset(&self) -> u32 {
        self.scroll
    }

    fn scroll_to(&mut self, offset: u32) {
        self.scroll = offset.min(self.max_scroll());
        self.events.push_back(EngineEvent::Scrolled);
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    fn apply_theme(&mut self, theme: &Theme) {
        // Terminals pick their own font; kept for display only
        self.theme = Some(theme.clone());
    }
}

fn location_of(index: usize) -> Location {
    Location::new(format!("{}{}", LOCATION_PREFIX, index + 1))
}

fn chapter_index(location: &Location, count: usize) -> Option<usize> {
    location
        .as_str()
        .strip_prefix(LOCATION_PREFIX)?
        .parse::<usize>()
        .ok()?
        .checked_sub(1)
        .filter(|i| *i < count)
}

fn parse_chapters(content: &str) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current = Chapter {
        title: None,
        paragraphs: Vec::new(),
    };
    let mut paragraph: Vec<&str> = Vec::new();

    fn flush(paragraph: &mut Vec<&str>, chapter: &mut Chapter) {
        if !paragraph.is_empty() {
            chapter.paragraphs.push(paragraph.join(" "));
            paragraph.clear();
        }
    }

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(title) = trimmed.strip_prefix("# ") {
            flush(&mut paragraph, &mut current);
            let finished = std::mem::replace(
                &mut current,
                Chapter {
                    title: Some(title.trim().to_string()),
                    paragraphs: Vec::new(),
                },
            );
            if finished.title.is_some() || !finished.paragraphs.is_empty() {
                chapters.push(finished);
            }
        } else if trimmed.is_empty() {
            flush(&mut paragraph, &mut current);
        } else {
            paragraph.push(trimmed);
        }
    }
    flush(&mut paragraph, &mut current);
    if current.title.is_some() || !current.paragraphs.is_empty() || chapters.is_empty() {
        chapters.push(current);
    }
    chapters
}

fn render(chapter: &Chapter) -> ContentTree {
    let tree = ContentTree::new("body");
    let root = tree.root();
    let block = |tag: &str, text: &str| {
        let element = tree.create_element(tag);
        let text = tree.create_text(text);
        // Fresh nodes under a fresh root cannot violate the hierarchy
        let _ = tree.append_child(element, text);
        let _ = tree.append_child(root, element);
    };

    if let Some(title) = &chapter.title {
        block("h1", title);
    }
    for paragraph in &chapter.paragraphs {
        block("p", paragraph);
    }
    tree
}

fn paragraph_nodes(tree: &ContentTree, root: folio_core::NodeId) -> Vec<folio_core::NodeId> {
    tree.children(root)
        .into_iter()
        .filter(|node| matches!(tree.kind(*node), Some(NodeKind::Element(tag)) if tag == "p"))
        .collect()
}

/// Greedy word wrap on whitespace, counting chars
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOOK: &str = "\
# Prolog

Saya Ayanokouji.
Senang bertemu Anda.

Paragraf kedua.

# Bab 1

Apa anda yakin?
";

    fn drain(engine: &mut TextEngine) -> Vec<EngineEvent> {
        std::iter::from_fn(|| engine.poll_event()).collect()
    }

    #[test]
    fn test_parse_chapters() {
        let chapters = parse_chapters(BOOK);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title.as_deref(), Some("Prolog"));
        assert_eq!(
            chapters[0].paragraphs,
            vec!["Saya Ayanokouji. Senang bertemu Anda.", "Paragraf kedua."]
        );
        assert_eq!(chapters[1].paragraphs, vec!["Apa anda yakin?"]);
    }

    #[test]
    fn test_text_without_headings_is_one_chapter() {
        let chapters = parse_chapters("satu\n\ndua\n");
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, None);
        assert_eq!(chapters[0].paragraphs.len(), 2);

        assert_eq!(parse_chapters("").len(), 1);
    }

    #[test]
    fn test_display_queues_content_and_location() {
        let mut engine = TextEngine::from_text(BOOK, 10);
        engine.display(None);

        let events = drain(&mut engine);
        assert!(matches!(events[0], EngineEvent::ContentReady(_)));
        assert!(
            matches!(&events[1], EngineEvent::LocationChanged(l) if l.as_str() == "chapter-1")
        );
        assert_eq!(engine.chapter_title(), Some("Prolog"));
    }

    #[test]
    fn test_unknown_location_falls_back_to_start() {
        let mut engine = TextEngine::from_text(BOOK, 10);
        engine.display(Some(&Location::new("chapter-9")));
        assert_eq!(engine.current_location().unwrap().as_str(), "chapter-1");

        engine.display(Some(&Location::new("epubcfi(/6/4)")));
        assert_eq!(engine.current_location().unwrap().as_str(), "chapter-1");

        engine.display(Some(&Location::new("chapter-2")));
        assert_eq!(engine.current_location().unwrap().as_str(), "chapter-2");
    }

    #[test]
    fn test_navigation_unloads_previous_unit() {
        let mut engine = TextEngine::from_text(BOOK, 10);
        engine.display(None);
        drain(&mut engine);

        assert_eq!(engine.go_next(), Step::Moved);
        let events = drain(&mut engine);
        assert!(matches!(events[0], EngineEvent::ContentUnloaded(UnitId(1))));
        assert_eq!(engine.go_next(), Step::Boundary);
        assert_eq!(engine.go_prev(), Step::Moved);
        assert_eq!(engine.go_prev(), Step::Boundary);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let long: String = (0..30).map(|i| format!("p{}\n\n", i)).collect();
        let mut engine = TextEngine::from_text(&long, 10);
        engine.display(None);
        drain(&mut engine);

        // 30 paragraphs with blank separators: 59 lines
        engine.scroll_by(100);
        assert_eq!(engine.scroll_offset(), 49);
        engine.scroll_by(-5);
        assert_eq!(engine.scroll_offset(), 44);
        engine.scroll_by(-100);
        assert_eq!(engine.scroll_offset(), 0);
        assert_eq!(drain(&mut engine).len(), 3);

        engine.scroll_by(-1);
        assert!(drain(&mut engine).is_empty());

        engine.scroll_to(1000);
        assert_eq!(engine.scroll_offset(), 49);
        assert_eq!(engine.visible_lines().len(), 10);
    }

    #[test]
    fn test_edit_paragraph_changes_rendered_text() {
        let mut engine = TextEngine::from_text(BOOK, 10);
        engine.display(None);
        let tree = engine.current_contents()[0].tree.clone();

        engine.edit_paragraph(2, "Terima kasih, Anda.").unwrap();
        assert_eq!(tree.pending_records(), 0);
        assert!(engine.view_lines().contains(&"Terima kasih, Anda.".to_string()));

        assert!(engine.edit_paragraph(0, "x").is_err());
        assert!(engine.edit_paragraph(3, "x").is_err());
    }

    #[test]
    fn test_view_lines_wrap() {
        let words = vec!["kata"; 40].join(" ");
        let mut engine = TextEngine::from_text(&format!("# Judul\n\n{}\n", words), 10);
        engine.display(None);

        let lines = engine.view_lines();
        assert_eq!(lines[0], "# Judul");
        assert_eq!(lines[1], "");
        assert!(lines[2..].iter().all(|l| l.chars().count() <= WRAP_WIDTH));
        assert_eq!(lines[2..].join(" "), words);
    }

    #[test]
    fn test_load_rejects_epub() {
        let temp_dir = TempDir::new().unwrap();
        let epub = temp_dir.path().join("COTE-Y0V0.epub");
        std::fs::write(&epub, b"PK").unwrap();
        assert!(TextEngine::load(&epub, 10).is_err());

        let txt = temp_dir.path().join("COTE-Y0V0.txt");
        std::fs::write(&txt, BOOK).unwrap();
        assert_eq!(TextEngine::load(&txt, 10).unwrap().chapter_count(), 2);
    }
}
