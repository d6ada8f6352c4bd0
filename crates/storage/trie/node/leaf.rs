use ethereum_rust_rlp::{
    decode::RLPDecode, encode::RLPEncode, error::RLPDecodeError, structs::Encoder,
};

use crate::nibbles::Nibbles;

/// Leaf node of an Ethereum Merkle Patricia Trie. Terminates a path and carries a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: Vec<u8>,
}

impl LeafNode {
    pub fn new(partial: Nibbles, value: Vec<u8>) -> Self {
        Self { partial, value }
    }
}

impl RLPEncode for LeafNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.partial.encode_compact())
            .encode_field(&self.value)
            .finish();
    }
}

impl RLPDecode for LeafNode {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = ethereum_rust_rlp::decode::decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let (compact, current): (Vec<u8>, &[u8]) = Vec::<u8>::decode_unfinished(payload)?;
        let (partial, is_leaf) = Nibbles::decode_compact(&compact);
        if !is_leaf {
            return Err(RLPDecodeError::MalformedData);
        }
        let (value, current) = Vec::<u8>::decode_unfinished(current)?;
        if !current.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((LeafNode::new(partial, value), rest))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let leaf = LeafNode::new(Nibbles::from_hex(vec![1, 2, 3, 16]), vec![0xde, 0xad]);
        let encoded = leaf.encode_to_vec();
        let decoded = LeafNode::decode(&encoded).unwrap();
        assert_eq!(decoded, leaf);
    }
}
