pub mod fingerprint;
pub mod snapshot;
pub mod state_store;
