pub mod ids;
pub mod store;
pub mod view;

pub use store::{TaskStore, Toggle};
pub use view::{Projection, project};
