//! Scripted rendering engine shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;

use folio_core::{
    ContentTree, ContentUnit, EngineEvent, Location, RenderingEngine, Step, TextTree, Theme, UnitId,
};

/// Renders one chapter at a time as `<body><p>text</p>...</body>`
pub struct ScriptedEngine {
    chapters: Vec<Vec<String>>,
    current: Option<usize>,
    rendered: Option<ContentUnit>,
    next_unit: u64,
    scroll: u32,
    events: VecDeque<EngineEvent>,
    pub scroll_requests: Vec<u32>,
    pub theme: Option<Theme>,
}

impl ScriptedEngine {
    pub fn new(chapters: &[&[&str]]) -> Self {
        Self {
            chapters: chapters
                .iter()
                .map(|paragraphs| paragraphs.iter().map(|p| p.to_string()).collect())
                .collect(),
            current: None,
            rendered: None,
            next_unit: 1,
            scroll: 0,
            events: VecDeque::new(),
            scroll_requests: Vec::new(),
            theme: None,
        }
    }

    pub fn location_of(index: usize) -> Location {
        Location::new(format!("chapter-{}", index))
    }

    pub fn chapter(&self) -> Option<usize> {
        self.current
    }

    pub fn tree(&self) -> Option<ContentTree> {
        self.rendered.as_ref().map(|unit| unit.tree.clone())
    }

    pub fn unit_id(&self) -> Option<UnitId> {
        self.rendered.as_ref().map(|unit| unit.id)
    }

    /// Text of the rendered chapter, paragraphs joined by newlines
    pub fn text(&self) -> String {
        let Some(unit) = &self.rendered else {
            return String::new();
        };
        unit.tree
            .children(unit.root)
            .into_iter()
            .map(|p| unit.tree.text_content(p))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// User scroll, as opposed to a `scroll_to` request
    pub fn scroll_by_user(&mut self, offset: u32) {
        self.scroll = offset;
        self.events.push_back(EngineEvent::Scrolled);
    }

    /// Lose every queued notification, as a host that renders silently
    pub fn drop_events(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }

    fn show(&mut self, index: usize) {
        if let Some(old) = self.rendered.take() {
            self.events.push_back(EngineEvent::ContentUnloaded(old.id));
        }

        let tree = ContentTree::new("body");
        for paragraph in &self.chapters[index] {
            let p = tree.create_element("p");
            let text = tree.create_text(paragraph);
            tree.append_child(p, text).expect("fresh nodes");
            tree.append_child(tree.root(), p).expect("fresh nodes");
        }
        let unit = ContentUnit::new(UnitId(self.next_unit), tree);
        self.next_unit += 1;

        self.current = Some(index);
        self.scroll = 0;
        self.rendered = Some(unit.clone());
        self.events.push_back(EngineEvent::ContentReady(unit));
        self.events.push_back(EngineEvent::LocationChanged(Self::location_of(index)));
    }
}

impl RenderingEngine for ScriptedEngine {
    fn display(&mut self, location: Option<&Location>) {
        let index = location
            .and_then(|l| l.as_str().strip_prefix("chapter-"))
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n < self.chapters.len())
            .unwrap_or(0);
        self.show(index);
    }

    fn current_location(&self) -> Option<Location> {
        self.current.map(Self::location_of)
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
        self.scroll_requests.push(offset);
        self.scroll = offset;
        self.events.push_back(EngineEvent::Scrolled);
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    fn apply_theme(&mut self, theme: &Theme) {
        self.theme = Some(theme.clone());
    }
}
