pub mod error;
pub mod peer_channels;
pub mod sync;

pub use error::SyncError;
