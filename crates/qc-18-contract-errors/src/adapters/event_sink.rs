//! # Event Sinks
//!
//! `TracingEventSink` logs each event as structured JSON. `RecordingEventSink`
//! keeps them in memory for assertions.

use crate::events::ContractErrorsEvent;
use crate::ports::outbound::EventSink;
use parking_lot::RwLock;
use tracing::info;

/// Publishes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ContractErrorsEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(event = event.name(), payload = %json, "[qc-18] event"),
            Err(e) => info!(event = event.name(), error = %e, "[qc-18] event (unencodable)"),
        }
    }
}

/// Keeps every emitted event.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: RwLock<Vec<ContractErrorsEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, oldest first.
    pub fn events(&self) -> Vec<ContractErrorsEvent> {
        self.events.read().clone()
    }

    /// Names of the emitted events.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(ContractErrorsEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: ContractErrorsEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Params;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        let event = ContractErrorsEvent::ParamsUpdated {
            authority: "gov".to_string(),
            new_params: Params::default(),
        };
        sink.emit(event.clone());
        TracingEventSink.emit(event.clone());

        assert_eq!(sink.events(), vec![event]);
        assert_eq!(sink.names(), vec!["params_updated"]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
