//! WF-001: Shared types - project configuration, delimiter tags, and the
//! error taxonomy surfaced by the composition engine.
//!
//! Configuration types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level weft.yaml
// ============================================================================

/// Root configuration - where templates live and how they are composed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeftConfig {
    /// Template directory, relative to the config file's directory
    #[serde(default)]
    pub base: Option<PathBuf>,

    /// Default layout, relative to `base`
    #[serde(default)]
    pub layout: Option<String>,

    /// Extra data keys (scalars are stringified)
    #[serde(default)]
    pub data: IndexMap<String, serde_yaml_ng::Value>,

    /// Delimiter pairs
    #[serde(default)]
    pub tags: Tags,

    /// Extensions that are composed (others are copied verbatim by `build`)
    #[serde(default = "default_watch")]
    pub watch: Vec<String>,

    /// Build output directory, relative to the config file's directory
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            base: None,
            layout: None,
            data: IndexMap::new(),
            tags: Tags::default(),
            watch: default_watch(),
            output: default_output(),
        }
    }
}

/// Extensions that are always composed.
pub const DEFAULT_WATCH: [&str; 2] = [".htm", ".html"];

fn default_watch() -> Vec<String> {
    DEFAULT_WATCH.iter().map(|s| s.to_string()).collect()
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

impl WeftConfig {
    /// Watched extensions, lower-cased and deduplicated, with `.htm`/`.html`
    /// always present.
    pub fn watched_extensions(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        let all = self
            .watch
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_WATCH.iter().copied());
        for ext in all {
            let ext = ext.to_lowercase();
            if !result.contains(&ext) {
                result.push(ext);
            }
        }
        result
    }

    /// Whether `path` has a watched extension.
    pub fn is_watched(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
        self.watched_extensions().contains(&ext)
    }

    /// Template directory for a config file living in `config_dir`.
    pub fn base_dir(&self, config_dir: &Path) -> PathBuf {
        let base = self.base.as_deref().unwrap_or_else(|| Path::new(""));
        super::paths::normalize(&config_dir.join(base))
    }

    /// Build output directory for a config file living in `config_dir`.
    pub fn output_dir(&self, config_dir: &Path) -> PathBuf {
        super::paths::normalize(&config_dir.join(&self.output))
    }
}

// ============================================================================
// Tags
// ============================================================================

/// The two delimiter pairs: one for data interpolation, one for structural
/// directives. Each pair is `[open, close]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default = "default_data_tags")]
    pub data: [String; 2],

    #[serde(default = "default_directive_tags")]
    pub directive: [String; 2],
}

fn default_data_tags() -> [String; 2] {
    ["{{".to_string(), "}}".to_string()]
}

fn default_directive_tags() -> [String; 2] {
    ["<!--".to_string(), "-->".to_string()]
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            data: default_data_tags(),
            directive: default_directive_tags(),
        }
    }
}

impl Tags {
    /// Build tags from explicit pairs.
    pub fn new(data: (&str, &str), directive: (&str, &str)) -> Self {
        Self {
            data: [data.0.to_string(), data.1.to_string()],
            directive: [directive.0.to_string(), directive.1.to_string()],
        }
    }

    /// True when both pairs are the same strings, in which case directive
    /// keywords must never be treated as data keys.
    pub fn coincide(&self) -> bool {
        self.data == self.directive
    }
}

/// Convert a YAML data value to its substitution string.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Kind of a recoverable resolution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An include or layout target could not be read.
    Io,
    /// A directive would reintroduce a file already active in its chain.
    Circle,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::Circle => write!(f, "circle"),
        }
    }
}

/// A non-fatal condition met while resolving a document. Surfaced on the
/// output channel; resolution always continues past it.
///
/// `directive` is the literal directive text, or `None` when the offending
/// target came from the default layout rather than an in-source directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveError {
    #[error(
        "found cyclic {} at {}",
        describe(.directive.as_deref()),
        .src.display()
    )]
    Circle {
        src: PathBuf,
        target: PathBuf,
        directive: Option<String>,
    },

    #[error(
        "cannot read {} for {} at {}: {}",
        .target.display(),
        describe(.directive.as_deref()),
        .src.display(),
        .message
    )]
    Io {
        src: PathBuf,
        target: PathBuf,
        directive: Option<String>,
        message: String,
    },
}

fn describe(directive: Option<&str>) -> String {
    match directive {
        Some(text) => format!("directive '{text}'"),
        None => "default layout".to_string(),
    }
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Circle { .. } => ErrorKind::Circle,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// The file whose directive triggered the error.
    pub fn src(&self) -> &Path {
        match self {
            Self::Circle { src, .. } | Self::Io { src, .. } => src,
        }
    }

    /// The include or layout target the directive pointed at.
    pub fn target(&self) -> &Path {
        match self {
            Self::Circle { target, .. } | Self::Io { target, .. } => target,
        }
    }

    pub fn directive(&self) -> Option<&str> {
        match self {
            Self::Circle { directive, .. } | Self::Io { directive, .. } => directive.as_deref(),
        }
    }
}

/// Fatal errors raised while constructing a composer or a document.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("document path must not be empty")]
    MissingPath,

    #[error("invalid tags: {0}")]
    Tags(String),

    #[error("cannot compile directive matcher: {0}")]
    Pattern(#[from] regex::Error),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wf001_config_defaults() {
        let config: WeftConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert!(config.base.is_none());
        assert!(config.layout.is_none());
        assert_eq!(config.tags, Tags::default());
        assert_eq!(config.watch, vec![".htm", ".html"]);
        assert_eq!(config.output, PathBuf::from("dist"));
    }

    #[test]
    fn test_wf001_config_parse_full() {
        let yaml = r#"
base: pages
layout: layout.html
data:
  title: Home
  year: 2024
  draft: false
tags:
  data: ["[[", "]]"]
  directive: ["<%", "%>"]
watch: [".TPL", ".html"]
output: public
"#;
        let config: WeftConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.base, Some(PathBuf::from("pages")));
        assert_eq!(config.layout.as_deref(), Some("layout.html"));
        assert_eq!(config.tags, Tags::new(("[[", "]]"), ("<%", "%>")));
        assert_eq!(yaml_value_to_string(&config.data["year"]), "2024");
        assert_eq!(yaml_value_to_string(&config.data["draft"]), "false");
        assert_eq!(config.watched_extensions(), vec![".tpl", ".html", ".htm"]);
    }

    #[test]
    fn test_wf001_partial_tags_keep_defaults() {
        let config: WeftConfig =
            serde_yaml_ng::from_str("tags:\n  data: [\"${\", \"}\"]\n").unwrap();
        assert_eq!(config.tags.data, ["${".to_string(), "}".to_string()]);
        assert_eq!(config.tags.directive, default_directive_tags());
    }

    #[test]
    fn test_wf001_is_watched() {
        let config = WeftConfig::default();
        assert!(config.is_watched(Path::new("/a/index.HTML")));
        assert!(config.is_watched(Path::new("b.htm")));
        assert!(!config.is_watched(Path::new("style.css")));
        assert!(!config.is_watched(Path::new("README")));
    }

    #[test]
    fn test_wf001_tags_coincide() {
        assert!(!Tags::default().coincide());
        assert!(Tags::new(("{{", "}}"), ("{{", "}}")).coincide());
    }

    #[test]
    fn test_wf001_yaml_value_null() {
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
    }

    #[test]
    fn test_wf001_resolve_error_display() {
        let circle = ResolveError::Circle {
            src: PathBuf::from("/site/a.html"),
            target: PathBuf::from("/site/a.html"),
            directive: Some("<!-- include(a.html) -->".to_string()),
        };
        assert_eq!(circle.kind(), ErrorKind::Circle);
        assert_eq!(
            circle.to_string(),
            "found cyclic directive '<!-- include(a.html) -->' at /site/a.html"
        );

        let io = ResolveError::Io {
            src: PathBuf::from("/site/a.html"),
            target: PathBuf::from("/site/layout.html"),
            directive: None,
            message: "not found".to_string(),
        };
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("default layout"));
        assert_eq!(io.target(), Path::new("/site/layout.html"));
        assert!(io.directive().is_none());
    }

    #[test]
    fn test_wf001_resolve_error_json() {
        let err = ResolveError::Circle {
            src: PathBuf::from("/a"),
            target: PathBuf::from("/b"),
            directive: None,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"circle\""));
    }
}
