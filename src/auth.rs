//! Credential models: redacted secrets and the persisted token state.

pub mod secret;
pub mod state;

pub use secret::*;
pub use state::*;
