//! WF-008: Composer - caller-facing construction and run API.
//!
//! A [`Composer`] holds everything shared by the documents it creates: the
//! root directory, compiled matchers, data values, the default layout and
//! the loader. Creating a [`Document`] is synchronous and performs no I/O;
//! resolution starts only when the document is run.

use super::channel::{channel, collect, Channel, Output, Rendered};
use super::compiler::Matchers;
use super::node::{Role, SourceNode};
use super::paths;
use super::resolver::Resolver;
use super::types::{yaml_value_to_string, ComposeError, Tags, WeftConfig};
use crate::loader::Loader;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Computes a data value from the root node of a document.
pub type ComputeFn = dyn Fn(&SourceNode) -> String + Send + Sync;

/// Picks a default layout for a document, given its absolute path.
pub type LayoutHook = dyn Fn(&Path) -> Option<PathBuf> + Send + Sync;

/// A value substituted for `{{key}}`.
#[derive(Clone)]
pub enum DataValue {
    Text(String),
    /// Evaluated once per document, against the root node.
    Computed(Arc<ComputeFn>),
}

impl DataValue {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&SourceNode) -> String + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    fn evaluate(&self, node: &SourceNode) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Computed(f) => f(node),
        }
    }
}

impl fmt::Debug for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for DataValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for DataValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Layout applied to root documents that carry no layout directive.
#[derive(Clone, Default)]
pub enum DefaultLayout {
    #[default]
    None,
    /// Resolved against the composer root.
    Path(PathBuf),
    /// Chosen per document; a relative result resolves against the root.
    Hook(Arc<LayoutHook>),
}

impl DefaultLayout {
    pub(crate) fn resolve(&self, src: &Path, root: &Path) -> Option<PathBuf> {
        let chosen = match self {
            Self::None => return None,
            Self::Path(path) => path.clone(),
            Self::Hook(hook) => hook(src)?,
        };
        if chosen.as_os_str().is_empty() {
            return None;
        }
        Some(paths::normalize(&root.join(chosen)))
    }
}

impl fmt::Debug for DefaultLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Construction options for a [`Composer`].
#[derive(Debug, Clone)]
pub struct ComposerOptions {
    /// Base for rooted include targets, layout targets and relative document
    /// paths.
    pub root: PathBuf,
    pub tags: Tags,
    /// Data values by key. Keys match case-insensitively.
    pub data: IndexMap<String, DataValue>,
    pub layout: DefaultLayout,
}

impl ComposerOptions {
    /// Default tags, no default layout, and the built-in `dirname`,
    /// `filename` and `extname` data values.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: paths::normalize(&root.into()),
            tags: Tags::default(),
            data: builtin_data(),
            layout: DefaultLayout::None,
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Add or replace a data value. Replaces built-ins of the same name.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        let key = key.into().to_lowercase();
        self.data.insert(key, value.into());
        self
    }

    pub fn with_layout(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout = DefaultLayout::Path(path.into());
        self
    }

    pub fn with_layout_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    {
        self.layout = DefaultLayout::Hook(Arc::new(hook));
        self
    }

    /// Options for a project described by `config`, whose file lives in
    /// `config_dir`. The composer root is the config's `base` directory.
    pub fn from_config(config: &WeftConfig, config_dir: &Path) -> Self {
        let mut options = Self::new(config.base_dir(config_dir)).with_tags(config.tags.clone());
        for (key, value) in &config.data {
            options = options.with_data(key.as_str(), yaml_value_to_string(value));
        }
        if let Some(layout) = config.layout.as_deref().filter(|l| !l.is_empty()) {
            let resolved = paths::resolve_layout(layout, &options.root);
            options = options.with_layout(resolved);
        }
        options
    }
}

fn builtin_data() -> IndexMap<String, DataValue> {
    let mut data = IndexMap::new();
    data.insert(
        "dirname".to_string(),
        DataValue::computed(|node| paths::relative_dirname(node.dirname(), node.root())),
    );
    data.insert(
        "filename".to_string(),
        DataValue::computed(|node| node.filename().to_string()),
    );
    data.insert(
        "extname".to_string(),
        DataValue::computed(|node| node.extname().to_string()),
    );
    data
}

struct Shared {
    options: ComposerOptions,
    matchers: Arc<Matchers>,
    loader: Arc<dyn Loader>,
}

/// Factory for documents sharing one configuration. Cheap to clone.
#[derive(Clone)]
pub struct Composer {
    shared: Arc<Shared>,
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl Composer {
    /// Compile the matchers for `options`. Fails only on invalid tags.
    pub fn new(options: ComposerOptions, loader: Arc<dyn Loader>) -> Result<Self, ComposeError> {
        let matchers = Matchers::compile(&options.tags, options.data.keys().map(String::as_str))?;
        tracing::debug!(
            root = %options.root.display(),
            keys = options.data.len(),
            layout = ?options.layout,
            "composer ready"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                options,
                matchers: Arc::new(matchers),
                loader,
            }),
        })
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.shared.options
    }

    pub fn root(&self) -> &Path {
        &self.shared.options.root
    }

    /// Absolute, normalized identity of `src` under this composer's root.
    pub fn resolve_src(&self, src: &Path) -> PathBuf {
        paths::normalize(&self.root().join(src))
    }

    /// Create a document for `source`, identified by `src`. A relative `src`
    /// is taken relative to the root. No I/O happens until the document runs.
    pub fn document(
        &self,
        src: impl AsRef<Path>,
        source: impl Into<String>,
    ) -> Result<Document, ComposeError> {
        let src = src.as_ref();
        if src.as_os_str().is_empty() {
            return Err(ComposeError::MissingPath);
        }
        let shared = &self.shared;
        let node = SourceNode::new(
            self.resolve_src(src),
            &shared.options.root,
            source.into(),
            Role::Root,
        );
        let data: HashMap<String, String> = shared
            .options
            .data
            .iter()
            .map(|(key, value)| (key.to_lowercase(), value.evaluate(&node)))
            .collect();
        Ok(Document {
            resolver: Resolver::new(
                node,
                data,
                Arc::clone(&shared.matchers),
                Arc::clone(&shared.loader),
                shared.options.layout.clone(),
            ),
        })
    }

    /// Read `src` through the loader and create a document from it.
    pub async fn open(&self, src: impl AsRef<Path>) -> Result<Document, ComposeError> {
        let src = src.as_ref();
        if src.as_os_str().is_empty() {
            return Err(ComposeError::MissingPath);
        }
        let path = self.resolve_src(src);
        let source = self
            .shared
            .loader
            .load(&path)
            .await
            .map_err(|source| ComposeError::Io {
                path: path.clone(),
                source,
            })?;
        self.document(path, source)
    }

    /// Resolve `source` to completion and collect the result.
    pub async fn render(
        &self,
        src: impl AsRef<Path>,
        source: impl Into<String>,
    ) -> Result<Rendered, ComposeError> {
        Ok(self.document(src, source)?.render().await)
    }
}

/// One document, ready to resolve.
pub struct Document {
    resolver: Resolver,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("src", &self.src())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Absolute identity of the document.
    pub fn src(&self) -> &Path {
        self.resolver.src()
    }

    /// Resolve on the current task, writing every event to `out`.
    pub async fn run(self, out: Channel) {
        self.resolver.run(out).await;
    }

    /// Resolve on a new tokio task. Must be called inside a runtime.
    pub fn spawn(self, out: Channel) -> JoinHandle<()> {
        tokio::spawn(self.run(out))
    }

    /// Spawn resolution and return the receiving end of its events.
    pub fn stream(self) -> UnboundedReceiver<Output> {
        let (tx, rx) = channel();
        self.spawn(tx);
        rx
    }

    /// Resolve and collect all text and errors.
    pub async fn render(self) -> Rendered {
        let (tx, rx) = channel();
        self.run(tx).await;
        collect(rx).await
    }
}
