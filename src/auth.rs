//! Auth-domain primitives: ordered scope lists, redacted secrets, and issued token sets.

pub mod scope;
pub mod token;

pub use scope::*;
pub use token::{secret::*, set::*};
