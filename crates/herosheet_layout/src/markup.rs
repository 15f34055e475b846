//! HTML-like markup loader
//!
//! Builds document nodes from markup that was already sanitized upstream.
//! This is a tolerant tree builder, not a validator: unknown tags become
//! plain elements, stray closing tags are dropped and unclosed tags are
//! closed at the end of input.

use std::sync::OnceLock;

use regex::Regex;

use crate::tree::{DocumentTree, NodeId};

/// Elements that never have children
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is kept verbatim as text
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse `markup` and append the resulting nodes to `parent`
///
/// Returns the top-level nodes that were appended.
pub fn parse_into(tree: &mut DocumentTree, parent: NodeId, markup: &str) -> Vec<NodeId> {
    let mut parser = MarkupParser::new(markup, parent);
    parser.run(tree);
    parser.top_level
}

/// Replace the children of `parent` with the parsed markup
pub fn set_inner_markup(tree: &mut DocumentTree, parent: NodeId, markup: &str) -> Vec<NodeId> {
    tree.clear_children(parent);
    parse_into(tree, parent, markup)
}

/// Remove every `<...>` run and decode entities, trimming the result
pub fn strip_tags(markup: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
    let stripped = tag.replace_all(markup, "");
    html_escape::decode_html_entities(&*stripped)
        .trim()
        .to_string()
}

/// Tag with optional attributes
#[derive(Debug)]
struct Tag {
    name: String,
    is_closing: bool,
    self_closing: bool,
    attrs: Vec<(String, String)>,
}

struct MarkupParser<'a> {
    input: &'a str,
    pos: usize,
    root: NodeId,
    /// Open elements, innermost last
    open: Vec<(String, NodeId)>,
    text: String,
    top_level: Vec<NodeId>,
}

impl<'a> MarkupParser<'a> {
    fn new(input: &'a str, root: NodeId) -> Self {
        Self {
            input,
            pos: 0,
            root,
            open: Vec::new(),
            text: String::new(),
            top_level: Vec::new(),
        }
    }

    fn run(&mut self, tree: &mut DocumentTree) {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];

            if rest.starts_with("<!--") {
                self.flush_text(tree);
                self.skip_past("-->");
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.flush_text(tree);
                self.skip_past(">");
                continue;
            }

            if self.peek() == Some('<') {
                if let Some(tag) = self.try_parse_tag() {
                    self.flush_text(tree);
                    self.handle_tag(tree, tag);
                    continue;
                }
            }

            // Regular character
            if let Some(ch) = self.next_char() {
                self.text.push(ch);
            }
        }

        self.flush_text(tree);
        // Remaining open elements are implicitly closed
        self.open.clear();
    }

    fn current(&self) -> NodeId {
        self.open.last().map(|(_, id)| *id).unwrap_or(self.root)
    }

    fn append(&mut self, tree: &mut DocumentTree, node: NodeId) {
        let parent = self.current();
        tree.append_child(parent, node);
        if parent == self.root {
            self.top_level.push(node);
        }
    }

    fn flush_text(&mut self, tree: &mut DocumentTree) {
        if self.text.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.text);
        let decoded = html_escape::decode_html_entities(&raw).into_owned();
        let node = tree.create_text(decoded);
        self.append(tree, node);
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.input[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_past(&mut self, needle: &str) {
        match self.input[self.pos..].find(needle) {
            Some(offset) => self.pos += offset + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn try_parse_tag(&mut self) -> Option<Tag> {
        let start = self.pos;

        if self.next_char()? != '<' {
            self.pos = start;
            return None;
        }

        let is_closing = if self.peek() == Some('/') {
            self.next_char();
            true
        } else {
            false
        };

        let name_start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }

        let name = self.input[name_start..self.pos].to_ascii_lowercase();
        if name.is_empty() {
            self.pos = start;
            return None;
        }

        self.skip_whitespace();

        let mut attrs = Vec::new();
        if !is_closing {
            while let Some(attr) = self.try_parse_attribute() {
                attrs.push(attr);
                self.skip_whitespace();
            }
        }

        self.skip_whitespace();

        let self_closing = if self.peek() == Some('/') {
            self.next_char();
            true
        } else {
            false
        };

        if self.peek() != Some('>') {
            self.pos = start;
            return None;
        }
        self.next_char();

        Some(Tag {
            name,
            is_closing,
            self_closing,
            attrs,
        })
    }

    fn try_parse_attribute(&mut self) -> Option<(String, String)> {
        let input = self.input;
        let start = self.pos;

        let name_start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.' | '@') {
                self.next_char();
            } else {
                break;
            }
        }

        let name = input[name_start..self.pos].to_ascii_lowercase();
        if name.is_empty() {
            self.pos = start;
            return None;
        }

        self.skip_whitespace();

        // Boolean attribute
        if self.peek() != Some('=') {
            return Some((name, String::new()));
        }
        self.next_char();
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.next_char();
                let value_start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch == quote {
                        break;
                    }
                    self.next_char();
                }
                let value = &input[value_start..self.pos];
                // Consume closing quote
                if self.peek() == Some(quote) {
                    self.next_char();
                }
                value
            }
            Some(_) => {
                let value_start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch.is_whitespace() || ch == '>' {
                        break;
                    }
                    self.next_char();
                }
                &input[value_start..self.pos]
            }
            None => {
                self.pos = start;
                return None;
            }
        };

        Some((name, html_escape::decode_html_entities(value).into_owned()))
    }

    fn handle_tag(&mut self, tree: &mut DocumentTree, tag: Tag) {
        if tag.is_closing {
            self.handle_closing_tag(&tag.name);
            return;
        }

        let element = tree.create_element(&tag.name);
        for (name, value) in &tag.attrs {
            tree.set_attr(element, name, value);
        }
        self.append(tree, element);

        if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !tag.self_closing {
            self.read_raw_text(tree, element, &tag.name);
            return;
        }

        if !tag.self_closing && !VOID_ELEMENTS.contains(&tag.name.as_str()) {
            self.open.push((tag.name, element));
        }
    }

    fn handle_closing_tag(&mut self, name: &str) {
        // Stray closing tags are ignored
        if let Some(index) = self.open.iter().rposition(|(open, _)| open == name) {
            self.open.truncate(index);
        }
    }

    fn read_raw_text(&mut self, tree: &mut DocumentTree, element: NodeId, name: &str) {
        let closing = format!("</{name}");
        let input = self.input;
        let rest = &input[self.pos..];
        let end = rest
            .to_ascii_lowercase()
            .find(&closing)
            .unwrap_or(rest.len());
        let body = &rest[..end];
        if !body.is_empty() {
            let text = tree.create_text(body);
            tree.append_child(element, text);
        }
        self.pos += end;
        if self.pos < self.input.len() {
            self.skip_past(">");
        }
    }
}
