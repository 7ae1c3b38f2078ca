pub mod queries;
pub mod readme;
pub mod sync;

pub use queries::*;
pub use readme::*;
pub use sync::*;
