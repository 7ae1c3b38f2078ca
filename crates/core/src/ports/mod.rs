pub mod client;
pub mod exec;
pub mod fs;
pub mod persistence;
pub mod store;

// Re-exports
pub use client::*;
pub use exec::*;
pub use fs::*;
pub use persistence::*;
pub use store::*;
