//! Removal of body placeholders left without text.

use crate::placeholder::{self, Capability};
use crate::slide::SlidePart;
use deck_core::Result;

/// Remove every body placeholder whose text is empty or whitespace.
/// Returns how many were removed.
pub fn prune_empty_placeholders(slide: &mut SlidePart) -> Result<usize> {
    let tree = slide.sp_tree_mut()?;
    let mut empty: Vec<usize> = placeholder::placeholders(tree)
        .into_iter()
        .filter(|p| p.capability == Capability::Body)
        .filter(|p| placeholder::shape_at(tree, p).map(placeholder::is_text_empty).unwrap_or(false))
        .map(|p| p.index)
        .collect();

    empty.sort_unstable_by(|a, b| b.cmp(a));
    for index in &empty {
        tree.children.remove(*index);
    }
    if !empty.is_empty() {
        log::debug!("Pruned {} empty placeholder(s) from {}", empty.len(), slide.part_name);
    }
    Ok(empty.len())
}
