//! Core composition logic - types, matching, node tree, resolution, config.

pub mod channel;
pub mod compiler;
pub mod composer;
pub mod cycle;
pub mod node;
pub mod parser;
pub mod paths;
pub(crate) mod resolver;
pub mod types;

pub use channel::{channel, collect, Channel, Output, Rendered};
pub use composer::{Composer, ComposerOptions, DataValue, DefaultLayout, Document};
pub use node::{Role, SourceNode};
pub use types::{ComposeError, ErrorKind, ResolveError, Tags, WeftConfig};
