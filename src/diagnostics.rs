//! Reporting of recovered field failures
//!
//! Field-level failures never abort a record; they are reported here and the
//! field falls back to its default. Transformers hold an injected
//! [`Diagnostics`] so callers decide where those reports go.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::coerce::CoercionError;

/// Sink for field-level events raised during a transform
pub trait Diagnostics: fmt::Debug + Send + Sync {
    /// A value could not be converted and was replaced by the field default
    fn coercion_failed(&self, field: &str, error: &CoercionError);

    /// A required field was absent in strict mode
    fn required_missing(&self, field: &str);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn coercion_failed(&self, field: &str, error: &CoercionError) {
        tracing::warn!(field, %error, "field conversion failed, using default");
    }

    fn required_missing(&self, field: &str) {
        tracing::error!(field, "required field is missing");
    }
}

/// Shared handle to the default sink
pub fn tracing_diagnostics() -> Arc<dyn Diagnostics> {
    Arc::new(TracingDiagnostics)
}

/// An event captured by [`MemoryDiagnostics`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    CoercionFailed { field: String, message: String },
    RequiredMissing { field: String },
}

impl DiagnosticEvent {
    pub fn field(&self) -> &str {
        match self {
            DiagnosticEvent::CoercionFailed { field, .. } => field,
            DiagnosticEvent::RequiredMissing { field } => field,
        }
    }
}

/// Collects events in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove and return all recorded events
    pub fn drain(&self) -> Vec<DiagnosticEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn coercion_failed(&self, field: &str, error: &CoercionError) {
        self.push(DiagnosticEvent::CoercionFailed {
            field: field.to_string(),
            message: error.to_string(),
        });
    }

    fn required_missing(&self, field: &str) {
        self.push(DiagnosticEvent::RequiredMissing {
            field: field.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_memory_diagnostics_records_in_order() {
        let sink = MemoryDiagnostics::new();
        sink.required_missing("id");
        sink.coercion_failed(
            "age",
            &CoercionError::Parse {
                target: FieldType::Integer,
                value: "abc".to_string(),
            },
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], DiagnosticEvent::RequiredMissing { field: "id".into() });
        assert_eq!(events[1].field(), "age");
    }

    #[test]
    fn test_drain_empties_sink() {
        let sink = MemoryDiagnostics::new();
        sink.required_missing("id");
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.events().is_empty());
    }
}
