use tokio::sync::oneshot;

use crate::{Event, EventError};

#[derive(Debug)]
pub struct EventRequest {
    pub event: Event,
    pub enqueued_at: std::time::Instant,
    pub resp_tx: oneshot::Sender<EventResponse>,
}

#[derive(Debug)]
pub struct EventResponse {
    pub outcome: Result<Event, EventError>,
    pub timings: Timings,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub queued_us: u64,
    pub chunk_us: u64,
}
