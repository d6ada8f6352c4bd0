pub mod types;

pub use ethereum_rust_rlp as rlp;
pub use types::*;
