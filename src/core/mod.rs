pub mod error;
pub mod path;
pub mod types;

pub use error::{NestedError, NestedResult};
pub use types::{Action, ActionKind, Operation};
