//! WF-004: Cycle detection over the include and layout chains.
//!
//! Pure predicates. Each walk is O(depth) with no memoization; realistic
//! template nesting keeps the chains short.

use super::node::{Arena, NodeId};
use std::path::Path;

/// True if `candidate` is `node`'s own source or that of any node reachable
/// through repeated `parent` links (the include chain).
pub(crate) fn is_cyclic_include(candidate: &Path, node: NodeId, arena: &Arena) -> bool {
    walk(candidate, node, arena, |id| arena[id].parent)
}

/// True if `candidate` is `node`'s own source or that of any node reachable
/// through repeated `slot` links (the layout chain).
pub(crate) fn is_cyclic_layout(candidate: &Path, node: NodeId, arena: &Arena) -> bool {
    walk(candidate, node, arena, |id| arena[id].slot)
}

fn walk<F>(candidate: &Path, start: NodeId, arena: &Arena, next: F) -> bool
where
    F: Fn(NodeId) -> Option<NodeId>,
{
    let mut current = Some(start);
    while let Some(id) = current {
        if arena[id].src() == candidate {
            return true;
        }
        current = next(id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{Role, SourceNode};
    use std::path::PathBuf;

    fn push(arena: &mut Arena, src: &str, role: Role) -> NodeId {
        arena.push(SourceNode::new(
            PathBuf::from(src),
            Path::new("/site"),
            String::new(),
            role,
        ))
    }

    #[test]
    fn test_wf004_self_include() {
        let mut arena = Arena::default();
        let a = push(&mut arena, "/site/a.html", Role::Root);
        assert!(is_cyclic_include(Path::new("/site/a.html"), a, &arena));
        assert!(!is_cyclic_include(Path::new("/site/b.html"), a, &arena));
    }

    #[test]
    fn test_wf004_include_chain() {
        let mut arena = Arena::default();
        let p = push(&mut arena, "/site/p.html", Role::Root);
        let q = push(&mut arena, "/site/q.html", Role::Include);
        let r = push(&mut arena, "/site/r.html", Role::Include);
        arena[q].parent = Some(p);
        arena[r].parent = Some(q);
        assert!(is_cyclic_include(Path::new("/site/p.html"), r, &arena));
        assert!(is_cyclic_include(Path::new("/site/q.html"), r, &arena));
        assert!(!is_cyclic_include(Path::new("/site/s.html"), r, &arena));
        // Include chain ignores layout wrapping
        assert!(!is_cyclic_layout(Path::new("/site/p.html"), r, &arena));
    }

    #[test]
    fn test_wf004_sibling_includes_are_not_cycles() {
        let mut arena = Arena::default();
        let root = push(&mut arena, "/site/index.html", Role::Root);
        let first = push(&mut arena, "/site/nav.html", Role::Include);
        arena[first].parent = Some(root);
        // A second include of nav.html from the root is legal
        assert!(!is_cyclic_include(Path::new("/site/nav.html"), root, &arena));
    }

    #[test]
    fn test_wf004_layout_chain() {
        let mut arena = Arena::default();
        let a = push(&mut arena, "/site/a.html", Role::Root);
        let b = push(&mut arena, "/site/b.html", Role::Layout);
        arena[a].layout = Some(b);
        arena[b].slot = Some(a);
        assert!(is_cyclic_layout(Path::new("/site/a.html"), b, &arena));
        assert!(is_cyclic_layout(Path::new("/site/b.html"), b, &arena));
        assert!(!is_cyclic_layout(Path::new("/site/c.html"), b, &arena));
        // Layout chain ignores include parents
        assert!(!is_cyclic_include(Path::new("/site/a.html"), b, &arena));
    }
}
