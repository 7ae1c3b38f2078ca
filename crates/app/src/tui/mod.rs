pub mod app;
pub mod model;
pub mod terminal;
pub mod update;
pub mod view;

pub use app::run;
pub use model::*;
pub use update::*;
pub use view::*;
