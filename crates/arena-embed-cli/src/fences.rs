//! Finding and replacing `arena` fences in markdown documents

use arena_embed::templates::FENCE_LANG;
use markdown::ParseOptions;
use markdown::mdast::Node;

/// One fenced `arena` block and its byte range in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaFence {
    pub start: usize,
    pub end: usize,
    /// Body of the block, without the fences
    pub source: String,
}

pub fn find_arena_fences(document: &str) -> miette::Result<Vec<ArenaFence>> {
    let root = markdown::to_mdast(document, &ParseOptions::gfm())
        .map_err(|e| miette::miette!("failed to parse markdown: {e}"))?;

    let mut fences = Vec::new();
    collect(&root, &mut fences);
    fences.sort_by_key(|f| f.start);
    Ok(fences)
}

fn collect(node: &Node, fences: &mut Vec<ArenaFence>) {
    if let Node::Code(code) = node {
        let is_arena = code
            .lang
            .as_deref()
            .is_some_and(|lang| lang.eq_ignore_ascii_case(FENCE_LANG));
        if let (true, Some(position)) = (is_arena, &code.position) {
            fences.push(ArenaFence {
                start: position.start.offset,
                end: position.end.offset,
                source: code.value.clone(),
            });
        }
    }
    if let Some(children) = node.children() {
        for child in children {
            collect(child, fences);
        }
    }
}

/// Replace each fence with its rendered HTML.
///
/// `fences` must be sorted and non-overlapping, as returned by [`find_arena_fences`].
pub fn splice(document: &str, fences: &[ArenaFence], rendered: &[String]) -> String {
    let mut out = String::with_capacity(document.len());
    let mut cursor = 0;
    for (fence, html) in fences.iter().zip(rendered) {
        out.push_str(&document[cursor..fence.start]);
        out.push_str(html);
        cursor = fence.end;
    }
    out.push_str(&document[cursor..]);
    out
}
