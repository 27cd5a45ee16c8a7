pub mod error;
pub mod payload;
pub mod registry;
pub mod resolver;
pub mod types;

pub use error::{CoreError, Result};
