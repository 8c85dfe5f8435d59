//! Weft - streaming HTML template composition.
//!
//! Templates splice in other files with `include(...)`, wrap themselves in
//! layouts with `layout(...)` and `slot`, and substitute `{{key}}` data.
//! Output is streamed in document order as each piece resolves.

pub mod cli;
pub mod core;
pub mod loader;
