//! Token models returned by the authorization-code exchange.

pub mod secret;
pub mod set;
