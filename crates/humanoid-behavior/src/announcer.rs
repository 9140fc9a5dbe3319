//! [`Announcer`] – lets an FSM speak the name of each state it enters.
//!
//! Announcing is a debugging aid controlled by the live setting
//! `options.announce-fsm-states`.  The announcer only publishes an
//! [`EventPayload::Announce`] event on [`Topic::Speech`]; the voice
//! subsystem consumes it on its own thread.  When the voice is already
//! backlogged the announcement is dropped so speech never lags far behind
//! the robot's actual state.

use humanoid_middleware::{EventBus, Settings, Topic};
use humanoid_types::{Event, EventPayload};
use tracing::debug;

use crate::config::BehaviorConfig;

/// Setting that switches state announcements on and off at runtime.
pub const ANNOUNCE_SETTING: &str = "options.announce-fsm-states";

#[derive(Debug, Clone)]
pub struct Announcer {
    bus: EventBus,
    settings: Settings,
    backlog_limit: usize,
}

impl Announcer {
    pub fn new(bus: EventBus, settings: Settings, config: &BehaviorConfig) -> Self {
        Self {
            bus,
            settings,
            backlog_limit: config.voice_backlog_limit,
        }
    }

    /// Queue `text` for speaking.  Returns `true` if it was queued.
    pub fn announce(&self, text: &str) -> bool {
        if !self.settings.get_bool(ANNOUNCE_SETTING, false) {
            return false;
        }
        if self.bus.backlog(Topic::Speech) >= self.backlog_limit {
            debug!(%text, "voice backlogged; announcement dropped");
            return false;
        }
        let event = Event::new(
            "humanoid-behavior::announcer",
            EventPayload::Announce(text.to_string()),
        );
        match self.bus.publish_to(Topic::Speech, event) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, %text, "announcement not delivered");
                false
            }
        }
    }
}
