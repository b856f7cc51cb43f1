//! Markup helpers shared by the extractors, the scorer and the validator.

use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

/// Tags whose text never reaches the reader.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// True when the element is hidden via the `hidden` attribute or an inline
/// `display:none` style.
pub fn is_hidden(element: &Element) -> bool {
    if element.attr("hidden").is_some() {
        return true;
    }
    element
        .attr("style")
        .map(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none")
        })
        .unwrap_or(false)
}

/// Visible text of an element: text nodes joined by single spaces, with
/// scripts, styles and hidden subtrees skipped.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                for word in text.split_whitespace() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(word);
                }
            }
            Node::Element(el) => {
                if INVISIBLE_TAGS.contains(&el.name()) || is_hidden(el) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// Visible text of a whole document.
pub fn document_text(html: &str) -> String {
    let document = Html::parse_document(html);
    visible_text(document.root_element())
}

/// Normalized prefix used to compare two fetches of the same page.
pub fn normalized_prefix(html: &str, max_chars: usize) -> String {
    let text = document_text(html).to_lowercase();
    char_prefix(&text, max_chars).to_string()
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn char_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Detach comments, hidden elements and every element named in `tags`.
pub fn strip_non_content(document: &mut Html, tags: &[String]) {
    let doomed: Vec<_> = document
        .tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Comment(_) => true,
            Node::Element(el) => tags.iter().any(|t| t == el.name()) || is_hidden(el),
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}
