//! WF-005: Output channel - the `data` / `error` / `end` event stream.
//!
//! Every node of a document writes through the same [`Channel`]. Include
//! children and layouts run only while their requester is paused, so plain
//! emission order is already source order; the `origin` tag records which
//! kind of node produced each chunk.

use super::node::Role;
use super::types::ResolveError;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One event on the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Output {
    /// A chunk of resolved text.
    Data { text: String, origin: Role },
    /// A recoverable condition; resolution continues.
    Error { error: ResolveError },
    /// Resolution is complete. Sent exactly once.
    End,
}

/// Sending half of the output stream.
#[derive(Debug, Clone)]
pub struct Channel {
    tx: UnboundedSender<Output>,
}

/// Create a connected channel pair.
pub fn channel() -> (Channel, UnboundedReceiver<Output>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Channel { tx }, rx)
}

impl Channel {
    /// Emit a text chunk. Empty chunks are dropped.
    pub fn data(&self, text: &str, origin: Role) {
        if text.is_empty() {
            return;
        }
        self.send(Output::Data {
            text: text.to_string(),
            origin,
        });
    }

    pub fn error(&self, error: ResolveError) {
        self.send(Output::Error { error });
    }

    pub fn end(&self) {
        self.send(Output::End);
    }

    // A dropped receiver means nobody is listening; resolution still runs to
    // completion.
    fn send(&self, event: Output) {
        if self.tx.send(event).is_err() {
            tracing::trace!("output receiver dropped, event discarded");
        }
    }
}

/// A fully collected document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub errors: Vec<ResolveError>,
}

/// Drain a receiver until `End` (or until every sender is gone).
pub async fn collect(mut rx: UnboundedReceiver<Output>) -> Rendered {
    let mut rendered = Rendered::default();
    while let Some(event) = rx.recv().await {
        match event {
            Output::Data { text, .. } => rendered.text.push_str(&text),
            Output::Error { error } => rendered.errors.push(error),
            Output::End => break,
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_wf005_collect_in_order() {
        let (tx, rx) = channel();
        tx.data("a", Role::Root);
        tx.data("", Role::Root);
        tx.data("b", Role::Include);
        tx.error(ResolveError::Circle {
            src: PathBuf::from("/a"),
            target: PathBuf::from("/a"),
            directive: None,
        });
        tx.data("c", Role::Layout);
        tx.end();
        tx.data("ignored after end", Role::Root);
        let rendered = collect(rx).await;
        assert_eq!(rendered.text, "abc");
        assert_eq!(rendered.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_wf005_empty_chunks_not_sent() {
        let (tx, mut rx) = channel();
        tx.data("", Role::Root);
        tx.end();
        assert_eq!(rx.recv().await, Some(Output::End));
    }

    #[test]
    fn test_wf005_dropped_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.data("x", Role::Root);
        tx.end();
    }

    #[test]
    fn test_wf005_output_json() {
        let event = Output::Data {
            text: "hi".into(),
            origin: Role::Include,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"data","text":"hi","origin":"include"}"#);
        assert_eq!(
            serde_json::to_string(&Output::End).unwrap(),
            r#"{"event":"end"}"#
        );
    }
}
