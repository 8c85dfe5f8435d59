//! WF-003: Source nodes - one in-progress resolution of one document.
//!
//! Nodes live in an [`Arena`] owned by the resolver and refer to each other
//! through [`NodeId`] handles: `parent` for includes, `slot`/`layout` for
//! layout wrapping. The handles are non-owning; every node lives exactly as
//! long as the document being resolved.

use serde::Serialize;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

/// Handle to a node inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Why a node exists. Also tags every data chunk the node emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The requested document. Owns data/default-layout resolution.
    Root,
    /// Created by an `include(...)` directive.
    Include,
    /// Created to wrap another node.
    Layout,
}

/// Scan state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Constructed; bootstrap (skip/layout decisions) not yet run.
    Pending,
    /// Bootstrapped; `index` walks forward through `source`.
    Scanning,
    /// `index == source.len()`; the tail has been written.
    Finished,
}

/// One resolution context bound to a single source text.
#[derive(Debug)]
pub struct SourceNode {
    src: PathBuf,
    root: PathBuf,
    dirname: PathBuf,
    filename: String,
    extname: String,
    source: String,
    index: usize,
    role: Role,
    pub(crate) phase: Phase,
    pub(crate) layout_target: Option<PathBuf>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) slot: Option<NodeId>,
    pub(crate) layout: Option<NodeId>,
}

impl SourceNode {
    /// `src` must already be absolute and normalized.
    pub(crate) fn new(src: PathBuf, root: &Path, source: String, role: Role) -> Self {
        let dirname = src.parent().map(Path::to_path_buf).unwrap_or_default();
        let filename = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extname = src
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            src,
            root: root.to_path_buf(),
            dirname,
            filename,
            extname,
            source,
            index: 0,
            role,
            phase: Phase::Pending,
            layout_target: None,
            parent: None,
            slot: None,
            layout: None,
        }
    }

    /// Path identity of the text being resolved.
    pub fn src(&self) -> &Path {
        &self.src
    }

    /// Base directory for rooted include and layout targets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing `src`; relative includes resolve against it.
    pub fn dirname(&self) -> &Path {
        &self.dirname
    }

    /// File stem of `src`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Extension of `src` with its leading dot, or empty.
    pub fn extname(&self) -> &str {
        &self.extname
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Scan cursor into `source`.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True only for the node that owns data and default-layout resolution.
    pub fn is_root_of_file(&self) -> bool {
        self.role == Role::Root
    }

    /// True once the node has scanned to the end of its own source. Says
    /// nothing about the layouts wrapping it.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// The layout this node is wrapped by, once accepted.
    pub fn layout_target(&self) -> Option<&Path> {
        self.layout_target.as_deref()
    }

    /// Move the cursor forward. The cursor never moves backward.
    pub(crate) fn advance(&mut self, to: usize) {
        debug_assert!(to >= self.index, "cursor moved backward");
        debug_assert!(to <= self.source.len(), "cursor past end of source");
        self.index = to.max(self.index).min(self.source.len());
    }

    /// Unscanned text from the cursor to the end.
    pub(crate) fn remaining(&self) -> &str {
        &self.source[self.index..]
    }

    /// Consume the rest of the source and mark the node finished.
    pub(crate) fn finish(&mut self) {
        self.index = self.source.len();
        self.phase = Phase::Finished;
    }
}

/// Owner of every node in one document tree.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    nodes: Vec<SourceNode>,
}

impl Arena {
    pub fn push(&mut self, node: SourceNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl Index<NodeId> for Arena {
    type Output = SourceNode;

    fn index(&self, id: NodeId) -> &SourceNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut SourceNode {
        &mut self.nodes[id.0]
    }
}
