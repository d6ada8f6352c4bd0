mod branch;
mod extension;
mod leaf;

pub use branch::BranchNode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;

use ethereum_rust_rlp::{
    decode::{get_item_with_prefix, RLPDecode},
    encode::RLPEncode,
    error::RLPDecodeError,
};

use crate::node_hash::NodeHash;

/// A node of an Ethereum Merkle Patricia Trie, in one of its three shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Branch(BranchNode),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<BranchNode> for Node {
    fn from(value: BranchNode) -> Self {
        Node::Branch(value)
    }
}

impl From<ExtensionNode> for Node {
    fn from(value: ExtensionNode) -> Self {
        Node::Extension(value)
    }
}

impl From<LeafNode> for Node {
    fn from(value: LeafNode) -> Self {
        Node::Leaf(value)
    }
}

impl Node {
    /// Computes the node's hash: the Keccak-256 of its RLP encoding, or the encoding
    /// itself when it is shorter than 32 bytes (`NodeHash::Inline`).
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(self.encode_to_vec())
    }

    /// Counts the RLP list items a raw encoded node starts with, without fully decoding it.
    /// Branch nodes always have 17 fields (16 choices + value); extension and leaf nodes
    /// have 2 (the compact path and either a child hash or a value).
    fn field_count(rlp: &[u8]) -> Result<usize, RLPDecodeError> {
        let (is_list, mut payload, _) = ethereum_rust_rlp::decode::decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let mut count = 0;
        while !payload.is_empty() {
            let (_, rest) = get_item_with_prefix(payload)?;
            payload = rest;
            count += 1;
        }
        Ok(count)
    }
}

impl RLPEncode for Node {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            Node::Branch(n) => n.encode(buf),
            Node::Extension(n) => n.encode(buf),
            Node::Leaf(n) => n.encode(buf),
        }
    }
}

impl RLPDecode for Node {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        match Node::field_count(rlp)? {
            17 => {
                let (node, rest) = BranchNode::decode_unfinished(rlp)?;
                Ok((Node::Branch(node), rest))
            }
            2 => {
                // Both extension and leaf nodes are [compact_path, payload]; the compact
                // path's flag nibble tells them apart, so try leaf first and fall back.
                if let Ok((node, rest)) = LeafNode::decode_unfinished(rlp) {
                    Ok((Node::Leaf(node), rest))
                } else {
                    let (node, rest) = ExtensionNode::decode_unfinished(rlp)?;
                    Ok((Node::Extension(node), rest))
                }
            }
            _ => Err(RLPDecodeError::MalformedData),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nibbles::Nibbles;

    #[test]
    fn branch_round_trip() {
        let mut choices: [NodeHash; 16] = Default::default();
        choices[3] = NodeHash::Hashed(ethereum_types::H256::repeat_byte(0x11));
        let node: Node = BranchNode::new(choices).into();
        let encoded = node.encode_to_vec();
        let decoded = Node::decode(&encoded).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn leaf_round_trip() {
        let node: Node = LeafNode::new(Nibbles::from_hex(vec![5, 6, 16]), vec![1, 2, 3]).into();
        let encoded = node.encode_to_vec();
        let decoded = Node::decode(&encoded).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn extension_round_trip() {
        let node: Node = ExtensionNode::new(
            Nibbles::from_hex(vec![1, 2]),
            NodeHash::Hashed(ethereum_types::H256::repeat_byte(0x22)),
        )
        .into();
        let encoded = node.encode_to_vec();
        let decoded = Node::decode(&encoded).unwrap();
        assert_eq!(decoded, node);
    }
}
