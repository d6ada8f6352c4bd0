pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod structs;

pub use decode::{decode_rlp_item, get_item_with_prefix, get_rlp_bytes_item_payload, RLPDecode};
pub use encode::{encode, RLPEncode};
pub use error::{RLPDecodeError, RLPEncodeError};
