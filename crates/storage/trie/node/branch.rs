use ethereum_rust_rlp::{
    decode::RLPDecode, encode::RLPEncode, error::RLPDecodeError, structs::Encoder,
};

use crate::node_hash::NodeHash;

/// Branch node of an Ethereum Merkle Patricia Trie.
/// Has 16 child slots, one per nibble, plus an optional value for paths that end here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub choices: [NodeHash; 16],
    pub value: Vec<u8>,
}

impl BranchNode {
    pub fn new(choices: [NodeHash; 16]) -> Self {
        Self {
            choices,
            value: Vec::new(),
        }
    }

    pub fn with_value(choices: [NodeHash; 16], value: Vec<u8>) -> Self {
        Self { choices, value }
    }
}

impl RLPEncode for BranchNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        let mut encoder = Encoder::new(buf);
        for choice in self.choices.iter() {
            encoder = encoder.encode_field(choice);
        }
        encoder.encode_field(&self.value).finish();
    }
}

impl RLPDecode for BranchNode {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = ethereum_rust_rlp::decode::decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let mut choices: [NodeHash; 16] = Default::default();
        let mut current = payload;
        for choice in choices.iter_mut() {
            let (decoded, remaining) = NodeHash::decode_unfinished(current)?;
            *choice = decoded;
            current = remaining;
        }
        let (value, current) = Vec::<u8>::decode_unfinished(current)?;
        if !current.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok((BranchNode::with_value(choices, value), rest))
    }
}
