//! WordprocessingML views over the XML tree.
//!
//! A story container (the body, a header or a footer) holds block-level
//! paragraphs (`w:p`) and tables (`w:tbl`). Tables hold rows (`w:tr`), rows
//! hold cells (`w:tc`), and cells are story containers again. Paragraph text
//! is the concatenation of the text of its runs (`w:r`), including runs
//! nested in inline wrappers such as hyperlinks and tracked insertions.
//!
//! Content controls (`w:sdt`) and custom XML (`w:customXml`) are transparent
//! at every level: their content is walked as if it sat in the parent.

use super::xml::{Element, Node};

const PARAGRAPH: &str = "p";
const RUN: &str = "r";
const RUN_PROPERTIES: &str = "rPr";
const TEXT: &str = "t";
const TABLE: &str = "tbl";
const ROW: &str = "tr";
const CELL: &str = "tc";
const CONTENT_CONTROL: &str = "sdt";
const CONTENT_CONTROL_CONTENT: &str = "sdtContent";
const CUSTOM_XML: &str = "customXml";

/// Inline elements whose runs are part of the paragraph's visible text
const INLINE_WRAPPERS: &[&str] = &[
    "hyperlink",
    "ins",
    "moveTo",
    "smartTag",
    "fldSimple",
    "dir",
    "bdo",
    CUSTOM_XML,
    CONTENT_CONTROL,
    CONTENT_CONTROL_CONTENT,
];

fn is_inline_wrapper(element: &Element) -> bool {
    INLINE_WRAPPERS.iter().any(|local| element.is(local))
}

/// A block-level item of a story container
pub enum Block<'a> {
    Paragraph(Paragraph<'a>),
    Table(Table<'a>),
}

/// Paragraphs and tables of `container` in document order, including those
/// wrapped in content controls or custom XML
pub fn blocks(container: &mut Element) -> impl Iterator<Item = Block<'_>> {
    let mut found = Vec::new();
    collect_blocks(container, &mut found);
    found.into_iter()
}

fn collect_blocks<'e>(container: &'e mut Element, found: &mut Vec<Block<'e>>) {
    for element in container.child_elements_mut() {
        if element.is(PARAGRAPH) {
            found.push(Block::Paragraph(Paragraph { element }));
        } else if element.is(TABLE) {
            found.push(Block::Table(Table { element }));
        } else if let Some(content) = transparent_content(element) {
            collect_blocks(content, found);
        }
    }
}

/// The element whose children stand in for `element`'s own position
fn transparent_content(element: &mut Element) -> Option<&mut Element> {
    if element.is(CONTENT_CONTROL) {
        element.child_mut(CONTENT_CONTROL_CONTENT)
    } else if element.is(CUSTOM_XML) {
        Some(element)
    } else {
        None
    }
}

/// Visit every paragraph reachable from `container`, descending into tables
pub fn visit_paragraphs(container: &mut Element, visit: &mut dyn FnMut(&mut Paragraph<'_>)) {
    for block in blocks(container) {
        match block {
            Block::Paragraph(mut paragraph) => visit(&mut paragraph),
            Block::Table(mut table) => table.visit_paragraphs(visit),
        }
    }
}

/// Children named `local`, looking through row- and cell-level content controls
fn children_named<'e>(element: &'e mut Element, local: &'static str) -> Vec<&'e mut Element> {
    let mut found = Vec::new();
    collect_named(element, local, &mut found);
    found
}

fn collect_named<'e>(element: &'e mut Element, local: &str, found: &mut Vec<&'e mut Element>) {
    for child in element.child_elements_mut() {
        if child.is(local) {
            found.push(child);
        } else if let Some(content) = transparent_content(child) {
            collect_named(content, local, found);
        }
    }
}

/// Runs of a paragraph-level element in order, descending into inline wrappers
fn collect_runs<'e>(element: &'e Element, found: &mut Vec<&'e Element>) {
    for child in element.child_elements() {
        if child.is(RUN) {
            found.push(child);
        } else if is_inline_wrapper(child) {
            collect_runs(child, found);
        }
    }
}

fn contains_run(element: &Element) -> bool {
    let mut found = Vec::new();
    collect_runs(element, &mut found);
    !found.is_empty()
}

/// Keep the first run only. Wrappers emptied of their runs are dropped with
/// them; wrappers that never held runs (bookmarks, field codes) stay.
fn prune_to_first_run(element: &mut Element, seen_run: &mut bool) {
    element.retain_children(|node| match node {
        Node::Element(e) if e.is(RUN) => !std::mem::replace(seen_run, true),
        Node::Element(e) if is_inline_wrapper(e) => {
            if !contains_run(e) {
                return true;
            }
            prune_to_first_run(e, seen_run);
            contains_run(e)
        }
        _ => true,
    });
}

fn first_run_mut(element: &mut Element) -> Option<&mut Element> {
    for child in element.child_elements_mut() {
        if child.is(RUN) {
            return Some(child);
        }
        if is_inline_wrapper(child) {
            if let Some(run) = first_run_mut(child) {
                return Some(run);
            }
        }
    }
    None
}

// ============================================================================
// Paragraphs and runs
// ============================================================================

pub struct Paragraph<'a> {
    element: &'a mut Element,
}

impl<'a> Paragraph<'a> {
    pub fn new(element: &'a mut Element) -> Self {
        Self { element }
    }

    fn runs(&self) -> Vec<&Element> {
        let mut runs = Vec::new();
        collect_runs(&*self.element, &mut runs);
        runs
    }

    /// Logical paragraph text: run texts concatenated in document order
    pub fn text(&self) -> String {
        self.runs().into_iter().map(run_text).collect()
    }

    pub fn run_count(&self) -> usize {
        self.runs().len()
    }

    /// Text of each run, in order
    pub fn run_texts(&self) -> Vec<String> {
        self.runs().into_iter().map(run_text).collect()
    }

    /// Collapse the runs into the first one and give it `text`.
    ///
    /// The first run keeps its `w:rPr` and its place, even inside a
    /// hyperlink. Every later run is removed, including runs in inline
    /// wrappers, so no text is left behind out of order. A paragraph without
    /// runs gets a new plain run. Paragraph properties and bookmarks stay.
    pub fn replace_runs_with_text(&mut self, text: &str) {
        let mut seen_run = false;
        prune_to_first_run(&mut *self.element, &mut seen_run);

        match first_run_mut(&mut *self.element) {
            Some(run) => set_run_text(run, text),
            None => {
                let mut run = Element::new(self.element.qualify(RUN));
                set_run_text(&mut run, text);
                self.element.push(Node::Element(run));
            }
        }
    }
}

/// Text carried by a run, with tabs and breaks rendered as characters
pub fn run_text(run: &Element) -> String {
    let mut text = String::new();
    for child in run.child_elements() {
        match child.local_name() {
            b"t" => text.push_str(&child.text_content()),
            b"tab" | b"ptab" => text.push('\t'),
            b"cr" => text.push('\n'),
            b"br" => {
                let wraps = child
                    .attribute("type")
                    .map_or(true, |kind| kind == "textWrapping");
                if wraps {
                    text.push('\n');
                }
            }
            b"noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

/// Replace the run content with `text`, keeping only its properties
pub fn set_run_text(run: &mut Element, text: &str) {
    run.retain_children(|node| matches!(node, Node::Element(e) if e.is(RUN_PROPERTIES)));

    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush_text(run, &mut pending);
                let tab = Element::new(run.qualify("tab"));
                run.push(Node::Element(tab));
            }
            '\n' | '\r' => {
                flush_text(run, &mut pending);
                let br = Element::new(run.qualify("br"));
                run.push(Node::Element(br));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(run, &mut pending);
}

fn flush_text(run: &mut Element, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let t = Element::new(run.qualify(TEXT))
        .with_attribute("xml:space", "preserve")
        .with_text(std::mem::take(pending));
    run.push(Node::Element(t));
}

// ============================================================================
// Tables
// ============================================================================

pub struct Table<'a> {
    element: &'a mut Element,
}

impl<'a> Table<'a> {
    pub fn new(element: &'a mut Element) -> Self {
        Self { element }
    }

    pub fn rows(&mut self) -> impl Iterator<Item = Row<'_>> {
        children_named(&mut *self.element, ROW)
            .into_iter()
            .map(|element| Row { element })
    }

    pub fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph<'_>)) {
        for mut row in self.rows() {
            for mut cell in row.cells() {
                visit_paragraphs(cell.container(), visit);
            }
        }
    }
}

pub struct Row<'a> {
    element: &'a mut Element,
}

impl Row<'_> {
    pub fn cells(&mut self) -> impl Iterator<Item = Cell<'_>> {
        children_named(&mut *self.element, CELL)
            .into_iter()
            .map(|element| Cell { element })
    }

    /// Cell texts joined by tabs
    pub fn text(&mut self) -> String {
        self.cells()
            .map(|mut cell| cell.text())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

pub struct Cell<'a> {
    element: &'a mut Element,
}

impl Cell<'_> {
    /// The cell as a story container of paragraphs and nested tables
    pub fn container(&mut self) -> &mut Element {
        &mut *self.element
    }

    pub fn blocks(&mut self) -> impl Iterator<Item = Block<'_>> {
        blocks(&mut *self.element)
    }

    /// Text of the cell's own paragraphs, one per line
    pub fn text(&mut self) -> String {
        self.blocks()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph.text()),
                Block::Table(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
