use async_trait::async_trait;
use strikecount_core::types::Strike;

/// One still frame taken from the camera (or a recording) at a sampling instant.
///
/// Transient: it is handed to the classifier and dropped.
/// Carries only the encoded bytes; providers sniff the image format from them.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameSample {
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FrameSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSample")
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

impl FrameSample {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
pub trait StrikeClassifier: Send + Sync {
    /// Labels one frame. Errors are absorbed by the session loop.
    async fn classify(&self, frame: &FrameSample) -> anyhow::Result<Strike>;
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Acquires the camera / media source. Called once before a session starts.
    async fn open(&self) -> anyhow::Result<()>;

    async fn capture(&self) -> anyhow::Result<FrameSample>;
}

/// Small persistent string store (best score, profile, leaderboard entry).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachText {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[async_trait]
pub trait CoachProvider: Send + Sync {
    async fn complete(&self, system_message: &str, user_message: &str)
    -> anyhow::Result<CoachText>;
}
