pub mod repo;
pub mod source;
pub mod events;

// Re-exports for convenience
pub use repo::*;
pub use source::*;
pub use events::*;
