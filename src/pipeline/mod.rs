//! The `pipeline` module routes broker events through an ordered chain of
//! handlers.
//!
//! - `event`: the closed set of event variants a traversal can carry.
//! - `engine`: the [`Pipeline`] itself, the per-traversal
//!   [`PipelineContext`], and the [`Handler`] trait handlers implement.
//!
//! A pipeline is immutable once built and is shared between traversals behind
//! an `Arc`. Every call to [`Pipeline::fire`] starts an independent traversal
//! with its own context.

pub mod engine;
pub mod event;

pub use engine::{Handler, Pipeline, PipelineBuilder, PipelineContext, Traversal};
pub use event::{DeliverEvent, Event, EventKind, SunkEvent, TxAckEvent};

#[cfg(test)]
pub(crate) mod testing;
