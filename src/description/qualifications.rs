//! Qualification section detection

use crate::description::experience::HIGHLIGHT_CLASS;
use crate::description::fragment::{Element, Fragment, Node};

/// Class added to the element that starts the qualification section
pub const QUALIFICATION_CLASS: &str = "qualifications";

/// Bold headings the section title is searched in
const HEADING_TAGS: &[&str] = &["strong", "b"];

/// Substrings that mark a heading as the qualification section.
/// "skil" is a stem and also matches "skills".
const QUALIFICATION_KEYWORDS: &[&str] = &[
    "qualification",
    "qualifications",
    "requirement",
    "requirements",
    "skil",
    "skils",
    "require",
    "bring",
    "you",
];

/// Element id given to the section heading of a listing
pub fn qualification_anchor(listing_id: i64) -> String {
    format!("qualifications-{}", listing_id)
}

/// Tags the qualification section heading with an anchor id and class
///
/// Returns an unchanged copy if no heading or highlight is found.
pub fn tag_qualifications(fragment: &Fragment, listing_id: i64) -> Fragment {
    let mut tagged = fragment.clone();

    let Some(path) = find_qualification_section(fragment) else {
        return tagged;
    };

    if let Some(element) = tagged.element_at_mut(&path) {
        element.set_attr("id", &qualification_anchor(listing_id));
        element.add_class(QUALIFICATION_CLASS);
    }

    tagged
}

/// Locates the element that should carry the qualification anchor
///
/// The first bold heading mentioning a keyword wins; otherwise the first
/// highlighted experience mention. If the winner's grandparent directly
/// follows a bold element, that element is the real section title.
pub fn find_qualification_section(fragment: &Fragment) -> Option<Vec<usize>> {
    let found = fragment
        .find_element(|el| is_heading(el) && mentions_qualifications(el))
        .or_else(|| fragment.find_element(|el| el.has_class(HIGHLIGHT_CLASS)))?;

    Some(retarget_to_heading(fragment, found))
}

fn is_heading(element: &Element) -> bool {
    HEADING_TAGS.contains(&element.name.as_str())
}

fn mentions_qualifications(element: &Element) -> bool {
    let text = element.text();
    let text = text.trim().to_lowercase();
    QUALIFICATION_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword))
}

fn retarget_to_heading(fragment: &Fragment, path: Vec<usize>) -> Vec<usize> {
    // The fragment root has no siblings, so the grandparent must be an element
    if path.len() < 3 {
        return path;
    }

    let grandparent = &path[..path.len() - 2];
    let Some((&index, ancestors)) = grandparent.split_last() else {
        return path;
    };
    if index == 0 {
        return path;
    }

    let mut sibling = ancestors.to_vec();
    sibling.push(index - 1);

    match fragment.node_at(&sibling) {
        Some(Node::Element(el)) if is_heading(el) => sibling,
        _ => path,
    }
}
