//! Size bounding of descriptions

use crate::description::fragment::{Fragment, Node};
use crate::description::MAX_DESCRIPTION_BYTES;

/// Text appended to every truncated description
pub const TRUNCATION_MARKER: &str = "\n[Content has been truncated]";

/// Byte budget for kept content so that content plus marker fit the limit
pub fn default_truncation_budget() -> usize {
    MAX_DESCRIPTION_BYTES - TRUNCATION_MARKER.len()
}

/// Keeps the leading top-level children that fit in `max_bytes`
///
/// Children are measured by their serialized UTF-8 length and are kept or
/// dropped whole; the first child that would overflow the budget ends the
/// walk. The marker is always appended, so only call this on fragments that
/// are over the limit.
pub fn truncate(fragment: &Fragment, max_bytes: usize) -> Fragment {
    let mut used = 0;
    let mut kept = Vec::new();

    for child in &fragment.children {
        let size = child.to_html().len();
        if used + size > max_bytes {
            break;
        }
        used += size;
        kept.push(child.clone());
    }

    kept.push(Node::Text(TRUNCATION_MARKER.to_string()));
    Fragment::new(kept)
}
