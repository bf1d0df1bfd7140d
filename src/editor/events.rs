//! Notifications from the editor to the rendering layer.

use serde::Serialize;

use crate::error::DiagramError;

/// Something the rendering layer should react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagramEvent {
    /// The graph changed; redraw.
    GraphChanged,
    /// An edit was rejected; `reason` is meant for the status bar.
    ValidationFailed { reason: String },
}

impl From<&DiagramError> for DiagramEvent {
    fn from(err: &DiagramError) -> Self {
        Self::ValidationFailed {
            reason: err.to_string(),
        }
    }
}

/// Queue of events waiting to be picked up by the host UI loop.
///
/// Consecutive `GraphChanged` events collapse into one, since a single
/// redraw covers them all.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<DiagramEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: DiagramEvent) {
        if event == DiagramEvent::GraphChanged && self.events.last() == Some(&DiagramEvent::GraphChanged) {
            return;
        }
        self.events.push(event);
    }

    pub fn changed(&mut self) {
        self.emit(DiagramEvent::GraphChanged);
    }

    pub fn failed(&mut self, err: &DiagramError) {
        self.emit(err.into());
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_events_collapse() {
        let mut q = EventQueue::new();
        q.changed();
        q.changed();
        q.failed(&DiagramError::DuplicateConnection);
        q.changed();
        let events = q.drain();
        assert_eq!(
            events,
            vec![
                DiagramEvent::GraphChanged,
                DiagramEvent::ValidationFailed { reason: "Connector already exists".to_string() },
                DiagramEvent::GraphChanged,
            ]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&DiagramEvent::ValidationFailed { reason: "x".into() }).unwrap();
        assert_eq!(json, r#"{"event":"validation_failed","reason":"x"}"#);
    }
}
