use ethereum_rust_rlp::{
    decode::RLPDecode, encode::RLPEncode, error::RLPDecodeError, structs::Encoder,
};

use crate::{nibbles::Nibbles, node_hash::NodeHash};

/// Extension node of an Ethereum Merkle Patricia Trie.
/// Shares a nibble prefix between all of its descendants, pointing at a single child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeHash,
}

impl ExtensionNode {
    pub fn new(prefix: Nibbles, child: NodeHash) -> Self {
        Self { prefix, child }
    }
}

impl RLPEncode for ExtensionNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.prefix.encode_compact())
            .encode_field(&self.child)
            .finish();
    }
}

impl RLPDecode for ExtensionNode {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = ethereum_rust_rlp::decode::decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let (compact, current): (Vec<u8>, &[u8]) = Vec::<u8>::decode_unfinished(payload)?;
        let (prefix, is_leaf) = Nibbles::decode_compact(&compact);
        if is_leaf {
            return Err(RLPDecodeError::MalformedData);
        }
        let (child, current) = NodeHash::decode_unfinished(current)?;
        if !current.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((ExtensionNode::new(prefix, child), rest))
    }
}
