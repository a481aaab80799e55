pub mod achievements;
pub mod coach;
pub mod config;
pub mod history;
pub mod leaderboard;
pub mod profile;
pub mod text;
pub mod types;

// Keep the public surface small and intentional.
pub use achievements::*;
pub use coach::*;
pub use config::*;
pub use history::*;
pub use leaderboard::*;
pub use profile::*;
pub use text::*;
pub use types::*;
