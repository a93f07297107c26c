//! Credential models shared by the store, the refresh coordinator, and the client.

pub mod pair;
pub mod secret;

pub use pair::*;
pub use secret::*;
