// src/progress.rs

//! Lifecycle notifications for provider-backed services.
//!
//! The orchestrator and the decoder loop report what happens to a service
//! through a [`ProgressSink`]; rendering is up to the sink.

use std::fmt;
use std::io::{IsTerminal, Write};
use std::sync::Arc;

use tracing::{error, info};

/// A lifecycle notification keyed by service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Creating { service: String },
    Created { service: String },
    Removing { service: String },
    Removed { service: String },
    Info { service: String, message: String },
    Error { service: String, message: String },
}

impl ProgressEvent {
    pub fn service(&self) -> &str {
        match self {
            ProgressEvent::Creating { service }
            | ProgressEvent::Created { service }
            | ProgressEvent::Removing { service }
            | ProgressEvent::Removed { service }
            | ProgressEvent::Info { service, .. }
            | ProgressEvent::Error { service, .. } => service,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProgressEvent::Error { .. })
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Creating { service } => write!(f, "Service {service}  Creating"),
            ProgressEvent::Created { service } => write!(f, "Service {service}  Created"),
            ProgressEvent::Removing { service } => write!(f, "Service {service}  Removing"),
            ProgressEvent::Removed { service } => write!(f, "Service {service}  Removed"),
            ProgressEvent::Info { service, message } => write!(f, "Service {service}  {message}"),
            ProgressEvent::Error { service, message } => {
                write!(f, "Service {service}  Error {message}")
            }
        }
    }
}

/// Receiver of lifecycle notifications.
pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Sink that only emits `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn event(&self, event: ProgressEvent) {
        if event.is_error() {
            error!(service = %event.service(), "{event}");
        } else {
            info!(service = %event.service(), "{event}");
        }
    }
}

/// Sink that prints one line per event to stderr, keeping stdout for results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, " {event}");
    }
}

/// How lifecycle events are rendered by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Compact status lines, for an operator watching a terminal.
    Console,
    /// Structured log records, for captured or redirected output.
    Tracing,
}

impl SinkKind {
    pub fn for_terminal(is_terminal: bool) -> Self {
        if is_terminal {
            SinkKind::Console
        } else {
            SinkKind::Tracing
        }
    }

    /// Pick the kind from whether stderr is attached to a terminal.
    pub fn detect() -> Self {
        Self::for_terminal(std::io::stderr().is_terminal())
    }

    pub fn sink(self) -> Arc<dyn ProgressSink> {
        match self {
            SinkKind::Console => Arc::new(ConsoleSink),
            SinkKind::Tracing => Arc::new(TracingSink),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn redirected_output_uses_tracing_sink() {
        assert_eq!(SinkKind::for_terminal(true), SinkKind::Console);
        assert_eq!(SinkKind::for_terminal(false), SinkKind::Tracing);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let sink = SinkKind::Tracing.sink();
        tracing::subscriber::with_default(subscriber, || {
            sink.event(ProgressEvent::Created { service: "db".into() });
            sink.event(ProgressEvent::Error {
                service: "db".into(),
                message: "boom".into(),
            });
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "got {out}");
        assert!(lines[0].contains("INFO") && lines[0].contains("Service db  Created"));
        assert!(lines[1].contains("ERROR") && lines[1].contains("Service db  Error boom"));
    }

    #[test]
    fn display_includes_service_and_status() {
        let ev = ProgressEvent::Error {
            service: "db".into(),
            message: "boom".into(),
        };
        assert_eq!(ev.to_string(), "Service db  Error boom");
        assert_eq!(ev.service(), "db");
        assert!(ev.is_error());
        assert!(!ProgressEvent::Created { service: "db".into() }.is_error());
    }
}
