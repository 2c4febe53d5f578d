//! Outbound response definitions

use crate::engine::sensor::PanelTransition;
use crate::pad::model::PadState;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Identifier of an outbound response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResponseId {
    #[serde(rename = "DP_all_pads")]
    AllPads,
    #[serde(rename = "DP_profile_names")]
    ProfileNames,
    #[serde(rename = "DP_pad_connected")]
    PadConnected,
    #[serde(rename = "DP_frame_data")]
    FrameData,
    #[serde(rename = "DP_profile_new")]
    ProfileNew,
    #[serde(rename = "DP_profile_saved")]
    ProfileSaved,
    #[serde(rename = "DP_profile_loaded")]
    ProfileLoaded,
    #[serde(rename = "DP_profile_renamed")]
    ProfileRenamed,
    #[serde(rename = "DP_profile_removed")]
    ProfileRemoved,
    /// Unsolicited panel press/release from the data loop
    #[serde(rename = "DP_panel_event")]
    PanelEvent,
}

impl ResponseId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseId::AllPads => "DP_all_pads",
            ResponseId::ProfileNames => "DP_profile_names",
            ResponseId::PadConnected => "DP_pad_connected",
            ResponseId::FrameData => "DP_frame_data",
            ResponseId::ProfileNew => "DP_profile_new",
            ResponseId::ProfileSaved => "DP_profile_saved",
            ResponseId::ProfileLoaded => "DP_profile_loaded",
            ResponseId::ProfileRenamed => "DP_profile_renamed",
            ResponseId::ProfileRemoved => "DP_profile_removed",
            ResponseId::PanelEvent => "DP_panel_event",
        }
    }
}

impl std::fmt::Display for ResponseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an outbound response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Serials from the last enumeration
    Serials(Vec<String>),
    ProfileNames(Vec<String>),
    Connected(bool),
    /// Copy of the whole pad model
    Frame(Box<PadState>),
    ProfileName(String),
    Success(bool),
    /// Old and new profile name
    Renamed(String, String),
    Panel(PanelTransition),
}

/// One `(response_id, value)` pair for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: ResponseId,
    pub value: ResponseValue,
}

impl Response {
    pub fn new(id: ResponseId, value: ResponseValue) -> Self {
        Self { id, value }
    }
}

/// Non-blocking sender for the outbound channel
///
/// The data loop must never wait on the presentation layer, so a full
/// channel drops the response instead.
#[derive(Debug, Clone)]
pub struct ResponseSender {
    tx: mpsc::Sender<Response>,
}

impl ResponseSender {
    pub fn new(tx: mpsc::Sender<Response>) -> Self {
        Self { tx }
    }

    /// Create a bounded channel and its wrapped sender
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Response>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Returns whether the response was queued
    pub fn send(&self, response: Response) -> bool {
        match self.tx.try_send(response) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(response)) => {
                warn!("Response channel full, dropping {}", response.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(response)) => {
                debug!("Response channel closed, dropping {}", response.id);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
