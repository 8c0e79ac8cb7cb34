pub mod cli;
pub mod io;
pub mod logging;
pub mod model;
pub mod ops;
pub mod session;

pub use session::{SaveWarning, Session};
