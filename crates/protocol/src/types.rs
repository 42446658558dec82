use serde::{Deserialize, Serialize};

/// Current state of an upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "initializing")]
    Initializing,
    #[serde(rename = "transmitting")]
    Transmitting,
    #[serde(rename = "finalizing")]
    Finalizing,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "failed")]
    Failed,
}

impl UploadState {
    /// Returns `true` while the session still has work in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadState::Initializing | UploadState::Transmitting | UploadState::Finalizing
        )
    }
}

/// Immutable point-in-time view of an upload session.
///
/// Produced on every state change and handed to the caller's progress
/// callback; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    pub file_name: String,
    pub total_size: u64,
    pub chunks_uploaded: u64,
    pub total_chunks: u64,
    pub percent_complete: f64,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
