pub mod dedup;
pub mod reconciler;
pub mod store;
pub mod traits;
pub mod transcript;
