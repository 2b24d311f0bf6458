//! Typed events published by the ingest core
//!
//! Publishers hold only the broadcast sender; subscribers obtain receivers
//! from [`crate::IngestContext::subscribe`]. Sends to a channel with no
//! subscribers are silently dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use stratus_core::RadarProductGroup;
use tokio::sync::broadcast;

use crate::request::NexradFileRequest;

/// Channel capacity for ingest events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum Event {
    /// A provider discovered new remote objects
    NewDataAvailable {
        group: RadarProductGroup,
        product: String,
        latest_time: DateTime<Utc>,
    },
    /// The set of available Level-III products changed
    Level3ProductsChanged { radar_id: String },
    /// A radar product manager was constructed by the registry
    RadarProductManagerCreated { radar_id: String },
    /// A load request finished (successfully or not)
    RequestComplete { request: Arc<NexradFileRequest> },
}

pub type EventSender = broadcast::Sender<Event>;
pub type EventReceiver = broadcast::Receiver<Event>;
