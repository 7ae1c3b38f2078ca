pub mod exec;
pub mod fs;
pub mod github;
pub mod persistence;
pub mod store;
