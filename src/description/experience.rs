//! Years-of-experience detection and highlighting

use crate::description::fragment::{Element, Fragment, Node};
use regex::Regex;

/// Class of the span wrapped around every experience mention
pub const HIGHLIGHT_CLASS: &str = "highlight";

/// Text directly inside these elements is never scanned
const SKIPPED_PARENTS: &[&str] = &["script", "style", "span"];

/// Requirements strictly inside this range flag the listing
const FLAGGED_MIN_YEARS: u64 = 2;
const FLAGGED_MAX_YEARS: u64 = 20;

/// Finds "N years" style requirements and wraps them in highlight spans
#[derive(Debug, Clone)]
pub struct ExperienceHighlighter {
    pattern: Regex,
}

impl ExperienceHighlighter {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(\d+)\s*\+?\s*years?").expect("experience pattern is valid"),
        }
    }

    /// Returns the highlighted fragment and whether the listing is flagged
    ///
    /// The flag is set if any matched number is strictly between 2 and 20.
    /// Matches outside that range never clear it.
    pub fn highlight(&self, fragment: &Fragment) -> (Fragment, bool) {
        let mut flagged = false;
        let children = self.highlight_nodes(&fragment.children, None, &mut flagged);
        (Fragment::new(children), flagged)
    }

    fn highlight_nodes(&self, nodes: &[Node], parent: Option<&str>, flagged: &mut bool) -> Vec<Node> {
        let skip_text = parent.is_some_and(|name| SKIPPED_PARENTS.contains(&name));
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Text(text) if !skip_text => out.extend(self.highlight_text(text, flagged)),
                Node::Element(el) => out.push(Node::Element(Element {
                    name: el.name.clone(),
                    attrs: el.attrs.clone(),
                    children: self.highlight_nodes(&el.children, Some(&el.name), flagged),
                })),
                other => out.push(other.clone()),
            }
        }

        out
    }

    /// Splits one text node around its matches
    ///
    /// Matches are consumed last to first, so each split only touches text
    /// before the offsets still to be processed.
    fn highlight_text(&self, text: &str, flagged: &mut bool) -> Vec<Node> {
        let matches: Vec<_> = self.pattern.captures_iter(text).collect();
        if matches.is_empty() {
            return vec![Node::Text(text.to_string())];
        }

        let mut pieces = Vec::with_capacity(matches.len() * 2 + 1);
        let mut end = text.len();

        for captures in matches.iter().rev() {
            let Some(whole) = captures.get(0) else {
                continue;
            };

            if captures
                .get(1)
                .is_some_and(|years| exceeds_entry_level(years.as_str()))
            {
                *flagged = true;
            }

            if whole.end() < end {
                pieces.push(Node::Text(text[whole.end()..end].to_string()));
            }
            pieces.push(Node::Element(
                Element::new("span")
                    .with_attr("class", HIGHLIGHT_CLASS)
                    .with_text(whole.as_str()),
            ));
            end = whole.start();
        }

        if end > 0 {
            pieces.push(Node::Text(text[..end].to_string()));
        }

        pieces.reverse();
        pieces
    }
}

impl Default for ExperienceHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn exceeds_entry_level(digits: &str) -> bool {
    digits
        .parse::<u64>()
        .map(|years| years > FLAGGED_MIN_YEARS && years < FLAGGED_MAX_YEARS)
        .unwrap_or(false)
}
