//! WF-006: Lexical path handling for directive targets.
//!
//! Sources may be virtual (programmatically supplied text), so nothing here
//! touches the filesystem. Paths are normalized component-wise and compared
//! as identities by the cycle detector.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// A `..` that would climb above the filesystem root is dropped; a leading
/// `..` on a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let climbable = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if climbable {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when the directive argument is rooted (starts with a path separator).
fn is_rooted(arg: &str) -> bool {
    arg.starts_with('/') || arg.starts_with('\\')
}

fn strip_root(arg: &str) -> &str {
    arg.trim_start_matches(['/', '\\'])
}

/// Resolve an `include(...)` argument: relative to the including file's
/// directory, or to `root` when the argument is rooted.
pub fn resolve_include(arg: &str, dirname: &Path, root: &Path) -> PathBuf {
    if is_rooted(arg) {
        normalize(&root.join(strip_root(arg)))
    } else {
        normalize(&dirname.join(arg))
    }
}

/// Resolve a `layout(...)` argument. Layouts are always relative to `root`.
pub fn resolve_layout(arg: &str, root: &Path) -> PathBuf {
    normalize(&root.join(strip_root(arg)))
}

/// Directory of `dirname` relative to `root`, `/`-separated, with a trailing
/// slash. Empty when `dirname` is `root` itself or lies outside it.
pub fn relative_dirname(dirname: &Path, root: &Path) -> String {
    let Ok(relative) = dirname.strip_prefix(root) else {
        return String::new();
    };
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}/", parts.join("/"))
    }
}

/// Render a path with `/` separators for messages and data values.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// True when `path` does not lie inside `root`.
pub fn is_out_bound(path: &Path, root: &Path) -> bool {
    !normalize(path).starts_with(normalize(root))
}
