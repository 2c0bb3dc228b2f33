//! Error types shared across `txack`.
//!
//! Only structurally invalid pipeline input surfaces to callers as a
//! [`PipelineError`]. [`StoreError`] never leaves a store backend: backends
//! log it and report the boolean outcome the store contract promises.

use thiserror::Error;

use crate::pipeline::EventKind;

/// Errors that abort a pipeline traversal and reach the pipeline owner.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A handler was handed an event variant it cannot interpret.
    #[error("handler '{handler}' cannot process {kind} events")]
    InvalidEventType { handler: String, kind: EventKind },

    /// Two handlers with the same name were registered in one pipeline.
    #[error("a handler named '{0}' is already registered")]
    DuplicateHandler(String),

    /// The downstream delivery sink is gone; the commit stands but its
    /// delivery trigger could not be handed off.
    #[error("delivery sink closed while delivering message {message_id}")]
    DeliverySinkClosed { message_id: String },
}

/// Failures inside a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("row codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("message {0} already exists")]
    Duplicate(String),
}
