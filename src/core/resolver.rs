//! WF-007: Resolution engine - drives a document's node tree to completion.
//!
//! Control passes between nodes cooperatively. Exactly one node scans at a
//! time; it yields control only to
//! - a freshly loaded include child (which hands back to its parent when done),
//! - its layout (which runs until its `slot`, then hands to the wrapped node),
//! - the node it wraps, at a `slot` directive.
//!
//! Because every hand-off happens at the point the output belongs, chunks
//! reach the channel in final document order without any buffering. The
//! only suspension points are loader calls.

use super::channel::Channel;
use super::compiler::{Directive, Matchers};
use super::composer::DefaultLayout;
use super::cycle;
use super::node::{Arena, NodeId, Phase, Role, SourceNode};
use super::paths;
use super::types::ResolveError;
use crate::loader::Loader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the driver does after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Keep stepping the same node.
    Stay,
    /// Transfer control to another node.
    Goto(NodeId),
    /// The outermost node finished; `end` has been sent.
    Done,
}

/// Owns every node of one document and the configuration they share.
pub(crate) struct Resolver {
    arena: Arena,
    root: NodeId,
    data: HashMap<String, String>,
    matchers: Arc<Matchers>,
    loader: Arc<dyn Loader>,
    default_layout: DefaultLayout,
}

impl Resolver {
    /// `data` keys must already be lower-cased.
    pub(crate) fn new(
        root: SourceNode,
        data: HashMap<String, String>,
        matchers: Arc<Matchers>,
        loader: Arc<dyn Loader>,
        default_layout: DefaultLayout,
    ) -> Self {
        let mut arena = Arena::default();
        let root = arena.push(root);
        Self {
            arena,
            root,
            data,
            matchers,
            loader,
            default_layout,
        }
    }

    pub(crate) fn src(&self) -> &Path {
        self.arena[self.root].src()
    }

    /// Run until the outermost node ends. Always sends exactly one `end`.
    pub(crate) async fn run(mut self, out: Channel) {
        tracing::debug!(src = %self.src().display(), "resolving document");
        let mut current = self.root;
        loop {
            let step = match self.arena[current].phase {
                Phase::Pending => self.bootstrap(current, &out).await,
                Phase::Scanning => self.exec(current, &out).await,
                Phase::Finished => self.complete(current, &out),
            };
            match step {
                Step::Stay => {}
                Step::Goto(next) => current = next,
                Step::Done => break,
            }
        }
        tracing::debug!(
            src = %self.src().display(),
            nodes = self.arena.len(),
            "document resolved"
        );
    }

    /// Decide skip and layout wrapping before the first scan step.
    async fn bootstrap(&mut self, id: NodeId, out: &Channel) -> Step {
        let node = &self.arena[id];
        if self.matchers.has_skip(node.source()) {
            tracing::debug!(src = %node.src().display(), "skip directive, emitting verbatim");
            out.data(node.source(), node.role());
            self.arena[id].finish();
            return self.complete(id, out);
        }
        self.arena[id].phase = Phase::Scanning;

        let Some((target, directive)) = self.layout_for(id) else {
            return Step::Stay;
        };
        let src = self.arena[id].src().to_path_buf();

        if cycle::is_cyclic_layout(&target, id, &self.arena) {
            out.error(ResolveError::Circle {
                src,
                target,
                directive,
            });
            return Step::Stay;
        }

        match self.loader.load(&target).await {
            Ok(source) => {
                tracing::trace!(src = %src.display(), layout = %target.display(), "wrapping in layout");
                let root = self.arena[id].root().to_path_buf();
                let layout =
                    self.arena
                        .push(SourceNode::new(target.clone(), &root, source, Role::Layout));
                self.arena[layout].slot = Some(id);
                self.arena[id].layout = Some(layout);
                self.arena[id].layout_target = Some(target);
                Step::Goto(layout)
            }
            Err(e) => {
                out.error(ResolveError::Io {
                    src,
                    target,
                    directive,
                    message: e.to_string(),
                });
                Step::Stay
            }
        }
    }

    /// The layout requested for a node, with the directive text that asked
    /// for it (`None` for the default layout).
    ///
    /// Include nodes never get a layout. Layout nodes honour only their own
    /// in-source directive. The last layout directive in a source wins.
    fn layout_for(&self, id: NodeId) -> Option<(PathBuf, Option<String>)> {
        let node = &self.arena[id];
        if node.role() == Role::Include {
            return None;
        }
        match self.matchers.layout_directive(node.source()) {
            Some(found) => match &found.directive {
                Directive::Layout(arg) => Some((
                    paths::resolve_layout(arg, node.root()),
                    Some(found.text(node.source()).to_string()),
                )),
                _ => None,
            },
            None if node.is_root_of_file() => self
                .default_layout
                .resolve(node.src(), node.root())
                .map(|target| (target, None)),
            None => None,
        }
    }

    /// One scan step: emit up to the next directive and dispatch it, or emit
    /// the tail and complete.
    async fn exec(&mut self, id: NodeId, out: &Channel) -> Step {
        let node = &self.arena[id];
        let role = node.role();
        let Some(found) = self.matchers.next_directive(node.source(), node.index()) else {
            out.data(node.remaining(), role);
            self.arena[id].finish();
            return self.complete(id, out);
        };

        out.data(&node.source()[node.index()..found.range.start], role);
        let text = found.text(node.source()).to_string();
        self.arena[id].advance(found.range.end);

        match found.directive {
            Directive::Data(key) => {
                let value = self
                    .data
                    .get(&key.to_lowercase())
                    .map(String::as_str)
                    .unwrap_or(&text);
                out.data(value, role);
                Step::Stay
            }
            Directive::Slot => self.slot(id, &text, out),
            Directive::Include(arg) => self.include(id, &arg, text, out).await,
            // Layout decisions were made at bootstrap; the directive itself
            // produces no output.
            Directive::Layout(_) | Directive::NonLayout => Step::Stay,
            Directive::Skip => {
                out.data(&text, role);
                Step::Stay
            }
        }
    }

    fn slot(&self, id: NodeId, text: &str, out: &Channel) -> Step {
        let node = &self.arena[id];
        match node.slot {
            // The wrapped body was streamed at an earlier slot; nothing remains.
            Some(wrapped) if self.arena[wrapped].is_finished() => Step::Stay,
            Some(wrapped) => {
                tracing::trace!(
                    layout = %node.src().display(),
                    body = %self.arena[wrapped].src().display(),
                    "slot hand-off"
                );
                Step::Goto(wrapped)
            }
            None => {
                out.data(text, node.role());
                Step::Stay
            }
        }
    }

    async fn include(&mut self, id: NodeId, arg: &str, text: String, out: &Channel) -> Step {
        let node = &self.arena[id];
        let role = node.role();
        let src = node.src().to_path_buf();
        let root = node.root().to_path_buf();
        let target = paths::resolve_include(arg, node.dirname(), node.root());

        if cycle::is_cyclic_include(&target, id, &self.arena) {
            out.error(ResolveError::Circle {
                src,
                target,
                directive: Some(text.clone()),
            });
            out.data(&text, role);
            return Step::Stay;
        }

        match self.loader.load(&target).await {
            Ok(source) => {
                tracing::trace!(src = %src.display(), include = %target.display(), "splicing include");
                let child = self
                    .arena
                    .push(SourceNode::new(target, &root, source, Role::Include));
                self.arena[child].parent = Some(id);
                Step::Goto(child)
            }
            Err(e) => {
                out.error(ResolveError::Io {
                    src,
                    target,
                    directive: Some(text.clone()),
                    message: e.to_string(),
                });
                out.data(&text, role);
                Step::Stay
            }
        }
    }

    /// A node has written its tail. Resume its layout, else its includer,
    /// else the whole document is done.
    fn complete(&self, id: NodeId, out: &Channel) -> Step {
        let node = &self.arena[id];
        if let Some(layout) = node.layout {
            return Step::Goto(layout);
        }
        if let Some(parent) = node.parent {
            return Step::Goto(parent);
        }
        out.end();
        Step::Done
    }
}
