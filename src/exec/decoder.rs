// src/exec/decoder.rs

//! Protocol decoder loop.
//!
//! Reads plugin messages from stdout while the process driver waits for the
//! plugin to exit, then joins that wait exactly once. Lifecycle events are
//! reported to the progress sink as messages arrive.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::ChildStdout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{ProviderHostError, Result};
use crate::exec::process::{CANCELLED, WaitHandle};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::protocol::{PluginMessage, decode_line};
use crate::types::{Operation, ResultVariables};

/// Read messages until end-of-stream.
///
/// Stops at the first `error` message or protocol violation; later messages
/// are never looked at. Also stops when `cancel` fires.
pub async fn decode_stream<R>(
    reader: R,
    service: &str,
    op: Operation,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ResultVariables>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut variables = ResultVariables::new();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel.cancelled() => {
                return Err(ProviderHostError::Exit {
                    action: op.action(),
                    detail: CANCELLED.to_string(),
                });
            }
        };

        let Some(line) = line.map_err(|e| ProviderHostError::Protocol(e.to_string()))? else {
            break;
        };

        let Some(message) = decode_line(&line)? else {
            continue;
        };

        match message {
            PluginMessage::Error(text) => {
                return Err(ProviderHostError::PluginReported(text));
            }
            PluginMessage::Info(text) => {
                sink.event(ProgressEvent::Info {
                    service: service.to_string(),
                    message: text,
                });
            }
            PluginMessage::SetEnv { key, value } => {
                debug!(service = %service, key = %key, "plugin set variable");
                if variables.insert(key.clone(), value).is_some() {
                    warn!(service = %service, key = %key, "plugin set variable more than once; keeping last value");
                }
            }
        }
    }

    Ok(variables)
}

/// Drive a started plugin to completion.
///
/// The wait task behind `wait` must already be running. The output stream is
/// dropped (closing the pipe) before the wait is joined, so a plugin still
/// writing after an early decode failure gets a broken pipe instead of
/// blocking forever.
pub async fn execute_plugin(
    output: ChildStdout,
    wait: WaitHandle,
    service: &str,
    op: Operation,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ResultVariables> {
    sink.event(starting_event(op, service));

    let decoded = {
        let reader = BufReader::new(output);
        decode_stream(reader, service, op, sink, cancel).await
    };

    let variables = match decoded {
        Ok(variables) => variables,
        Err(err) => {
            sink.event(ProgressEvent::Error {
                service: service.to_string(),
                message: err.to_string(),
            });
            if let Err(exit_err) = wait.join().await {
                debug!(service = %service, error = %exit_err, "plugin exit after decode failure");
            }
            return Err(err);
        }
    };

    let detail = match wait.join().await {
        Ok(status) if status.success() => {
            sink.event(completed_event(op, service));
            return Ok(variables);
        }
        Ok(status) => status.to_string(),
        Err(err) => err.to_string(),
    };

    sink.event(ProgressEvent::Error {
        service: service.to_string(),
        message: detail.clone(),
    });
    Err(ProviderHostError::Exit {
        action: op.action(),
        detail,
    })
}

fn starting_event(op: Operation, service: &str) -> ProgressEvent {
    let service = service.to_string();
    match op {
        Operation::Up => ProgressEvent::Creating { service },
        Operation::Down => ProgressEvent::Removing { service },
    }
}

fn completed_event(op: Operation, service: &str) -> ProgressEvent {
    let service = service.to_string();
    match op {
        Operation::Up => ProgressEvent::Created { service },
        Operation::Down => ProgressEvent::Removed { service },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Collect {
        fn event(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    async fn decode(input: &str, sink: &Collect) -> Result<ResultVariables> {
        decode_stream(
            input.as_bytes(),
            "db",
            Operation::Up,
            sink,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn collects_variables_and_forwards_info() {
        let sink = Collect::default();
        let input = concat!(
            "{\"type\":\"info\",\"message\":\"pulling image\"}\n",
            "\n",
            "{\"type\":\"setenv\",\"message\":\"TOKEN=abc\"}\n",
        );
        let vars = decode(input, &sink).await.unwrap();
        assert_eq!(vars.get("TOKEN").map(String::as_str), Some("abc"));
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![ProgressEvent::Info {
                service: "db".into(),
                message: "pulling image".into()
            }]
        );
    }

    #[tokio::test]
    async fn error_stops_processing() {
        let sink = Collect::default();
        let input = concat!(
            "{\"type\":\"setenv\",\"message\":\"A=1\"}\n",
            "{\"type\":\"error\",\"message\":\"quota exceeded\"}\n",
            "{\"type\":\"info\",\"message\":\"never seen\"}\n",
        );
        match decode(input, &sink).await {
            Err(ProviderHostError::PluginReported(text)) => assert_eq!(text, "quota exceeded"),
            other => panic!("expected plugin error, got {other:?}"),
        }
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn protocol_violation_stops_processing() {
        let sink = Collect::default();
        let input = concat!(
            "{\"type\":\"setenv\",\"message\":\"BROKEN\"}\n",
            "{\"type\":\"info\",\"message\":\"never seen\"}\n",
        );
        assert!(matches!(
            decode(input, &sink).await,
            Err(ProviderHostError::Protocol(_))
        ));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_keep_last_value() {
        let sink = Collect::default();
        let input = concat!(
            "{\"type\":\"setenv\",\"message\":\"A=1\"}\n",
            "{\"type\":\"setenv\",\"message\":\"A=2\"}\n",
        );
        let vars = decode(input, &sink).await.unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["A"], "2");
    }

    #[tokio::test]
    async fn cancelled_decode_is_exit_error() {
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sink = Collect::default();
        let err = decode_stream(BufReader::new(reader), "db", Operation::Down, &sink, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to remove external service: operation cancelled");
    }
}
