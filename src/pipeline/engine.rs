//! Pipeline engine
//!
//! A [`Pipeline`] is an ordered, named list of handlers. Firing an event
//! presents it to the first handler that accepts its kind; that handler may
//! forward new or existing events further down the chain through its
//! [`PipelineContext`]. Handlers that do not accept a kind never see it.
//!
//! Notes:
//! - Forwarding is a plain synchronous call on the traversal's own thread.
//!   Decoupling slow downstream work is the job of the handler at that end
//!   of the chain (see `handler::deliver`).
//! - The first `Err` returned by any handler unwinds the whole traversal and
//!   is handed to whoever called [`Pipeline::fire`]. Nothing is retried.
//! - A `Sunk` event that runs off the end of the chain marks the traversal
//!   as complete.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::pipeline::event::{Event, EventKind};
use crate::utils::error::PipelineError;

/// A stage of a pipeline.
pub trait Handler: Send + Sync {
    /// Unique name within one pipeline; used in logs and errors.
    fn name(&self) -> &str;

    /// Event kinds this handler wants to see.
    fn handled_kinds(&self) -> &[EventKind];

    fn accepts(&self, kind: EventKind) -> bool {
        self.handled_kinds().contains(&kind)
    }

    /// Handle `event`, optionally forwarding events through `ctx`.
    fn process(&self, ctx: &mut PipelineContext<'_>, event: &Event) -> Result<(), PipelineError>;
}

/// Record of one finished traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traversal {
    /// Number of handler invocations made during the traversal.
    pub handled: usize,
    /// Whether a `Sunk` event reached the end of the chain.
    pub sunk: bool,
}

/// Position of one handler inside one traversal.
pub struct PipelineContext<'a> {
    pipeline: &'a Pipeline,
    next: usize,
    traversal: &'a mut Traversal,
}

impl<'a> PipelineContext<'a> {
    /// Context positioned so that the next forward starts at handler `next`.
    pub(crate) fn new(pipeline: &'a Pipeline, next: usize, traversal: &'a mut Traversal) -> Self {
        Self {
            pipeline,
            next,
            traversal,
        }
    }

    /// Present `event` to the next accepting handler after the current one.
    pub fn forward(&mut self, event: Event) -> Result<(), PipelineError> {
        let kind = event.kind();
        let pipeline = self.pipeline;
        let found = pipeline
            .handlers
            .iter()
            .enumerate()
            .skip(self.next)
            .find(|(_, handler)| handler.accepts(kind));

        let Some((index, handler)) = found else {
            if kind == EventKind::Sunk {
                self.traversal.sunk = true;
            } else {
                trace!(%kind, "event reached the end of the pipeline unhandled");
            }
            return Ok(());
        };

        self.traversal.handled += 1;
        let mut ctx = PipelineContext::new(pipeline, index + 1, &mut *self.traversal);
        trace!(handler = handler.name(), %kind, "dispatching event");
        handler.process(&mut ctx, &event)
    }
}

/// Immutable, ordered chain of handlers.
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run one traversal for `event`, starting at the head of the chain.
    pub fn fire(&self, event: Event) -> Result<Traversal, PipelineError> {
        let mut traversal = Traversal::default();
        PipelineContext::new(self, 0, &mut traversal).forward(event)?;
        Ok(traversal)
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    handlers: Vec<Arc<dyn Handler>>,
}

impl PipelineBuilder {
    /// Append a handler to the end of the chain.
    pub fn add_last(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let mut seen = HashSet::new();
        for handler in &self.handlers {
            if !seen.insert(handler.name().to_string()) {
                return Err(PipelineError::DuplicateHandler(handler.name().to_string()));
            }
        }
        Ok(Pipeline {
            handlers: self.handlers,
        })
    }
}
