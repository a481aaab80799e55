pub mod engine;
pub mod records;
pub mod session;
pub mod traits;
