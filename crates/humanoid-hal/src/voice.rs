//! Speech sink: turns announce events into spoken (or logged) text.
//!
//! Behaviours never speak synchronously.  They publish
//! [`EventPayload::Announce`] on [`Topic::Speech`]; the sink drains that
//! topic on its own OS thread and hands each line to a `speaker` callback
//! (a TTS engine on the robot, a log line in simulation).

use std::thread::{self, JoinHandle};

use humanoid_middleware::{EventBus, Topic};
use humanoid_types::EventPayload;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Spawn a thread that feeds every announce request on `bus` to `speaker`.
///
/// The thread exits once every clone of the bus has been dropped.
pub fn spawn_speech_sink<F>(bus: &EventBus, mut speaker: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut(&str) + Send + 'static,
{
    let mut rx = bus.subscribe_to(Topic::Speech);
    thread::Builder::new()
        .name("speech-sink".to_string())
        .spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(event) => {
                        if let EventPayload::Announce(text) = event.payload {
                            info!(%text, "say");
                            speaker(&text);
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(dropped = n, "speech sink lagged; announcements dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
}
