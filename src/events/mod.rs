// src/events/mod.rs

//! Typed event intake. External observers (platform connectors) push
//! `RoomEvent`s onto a channel; one consumer loop dispatches them to the
//! mention recorder or the strike manager. Events for rooms the registry
//! does not know are dropped before dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::CoverageEngine;

fn default_event_time() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A broadcast by the presence was observed in a room.
    Broadcast {
        destination_id: String,
        #[serde(default = "default_event_time")]
        at: DateTime<Utc>,
    },
    /// A human reply was observed in a room.
    Feedback {
        destination_id: String,
        text: String,
        #[serde(default = "default_event_time")]
        at: DateTime<Utc>,
    },
}

impl RoomEvent {
    pub fn destination_id(&self) -> &str {
        match self {
            RoomEvent::Broadcast { destination_id, .. } => destination_id,
            RoomEvent::Feedback { destination_id, .. } => destination_id,
        }
    }
}

/// Drain the event channel until every sender is gone. A failed event is
/// logged and does not stop the loop.
pub fn spawn_event_consumer(
    engine: Arc<CoverageEngine>,
    mut rx: mpsc::Receiver<RoomEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Event consumer started");

        while let Some(event) = rx.recv().await {
            let destination_id = event.destination_id();
            if !engine.is_registered(destination_id) {
                debug!("Dropping event for unregistered destination '{}'", destination_id);
                continue;
            }

            let result = match &event {
                RoomEvent::Broadcast { destination_id, at } => {
                    engine.record_mention(destination_id, *at).await
                }
                RoomEvent::Feedback {
                    destination_id,
                    text,
                    at,
                } => engine.record_feedback(destination_id, text, *at).await,
            };

            if let Err(e) = result {
                error!("Failed to process event for '{}': {:#}", destination_id, e);
            }
        }

        info!("Event stream closed, consumer exiting");
    })
}
