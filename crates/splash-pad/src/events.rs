use splash_proto::PadEvent;

/// Live push to observers. Fire-and-forget: implementations swallow their
/// own delivery failures.
pub trait EventSink {
    fn broadcast(&mut self, event: &PadEvent);
}

#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn broadcast(&mut self, _event: &PadEvent) {}
}

/// Keeps every event; handy for tests and replays.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<PadEvent>,
}

impl VecSink {
    pub fn states(&self) -> Vec<splash_proto::LaunchpadState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PadEvent::NewLaunchpadState { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for VecSink {
    fn broadcast(&mut self, event: &PadEvent) {
        self.events.push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn broadcast(&mut self, event: &PadEvent) {
        (**self).broadcast(event)
    }
}
