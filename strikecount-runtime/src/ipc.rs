use serde::{Deserialize, Serialize};
use strikecount_core::types::{CameraPermission, Goal};
use strikecount_engine::session::SessionSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    // Overrides the configured defaults for this run only.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub goal: Option<Goal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub snapshot: SessionSnapshot,
    pub camera: CameraPermission,
    pub best_score: u32,
}
