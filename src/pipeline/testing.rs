use std::sync::{Arc, Mutex};

use crate::pipeline::{Event, EventKind, Handler, PipelineContext};
use crate::utils::error::PipelineError;

/// Records every event it sees, then forwards it unchanged.
pub(crate) struct Recorder {
    name: String,
    kinds: Vec<EventKind>,
    seen: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub(crate) fn new(name: &str, kinds: &[EventKind]) -> (Arc<Self>, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Self {
            name: name.to_string(),
            kinds: kinds.to_vec(),
            seen: seen.clone(),
        });
        (recorder, seen)
    }
}

impl Handler for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handled_kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    fn process(&self, ctx: &mut PipelineContext<'_>, event: &Event) -> Result<(), PipelineError> {
        self.seen.lock().unwrap().push(event.clone());
        ctx.forward(event.clone())
    }
}
