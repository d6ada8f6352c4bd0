use bytes::BufMut;

use super::{
    decode::{decode_rlp_item, RLPDecode},
    encode::RLPEncode,
    error::RLPDecodeError,
};

/// Incrementally builds the RLP encoding of a struct as an RLP list, one field at a time.
/// `finish` wraps the accumulated payload with the list header.
pub struct Encoder<'a> {
    buf: &'a mut dyn BufMut,
    temp_buf: Vec<u8>,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut dyn BufMut) -> Self {
        Self {
            buf,
            temp_buf: Vec::new(),
        }
    }

    pub fn encode_field<T: RLPEncode>(mut self, value: &T) -> Self {
        value.encode(&mut self.temp_buf);
        self
    }

    pub fn encode_bytes(mut self, value: &[u8]) -> Self {
        value.to_vec().encode(&mut self.temp_buf);
        self
    }

    pub fn finish(self) {
        encode_list_payload(self.buf, &self.temp_buf);
    }
}

fn encode_list_payload(buf: &mut dyn BufMut, payload: &[u8]) {
    let len = payload.len();
    if len < 56 {
        buf.put_u8(0xc0 + len as u8);
    } else {
        let len_bytes = len.to_be_bytes();
        let start = len_bytes.iter().position(|&b| b != 0).unwrap_or(7);
        let len_bytes = &len_bytes[start..];
        buf.put_u8(0xf7 + len_bytes.len() as u8);
        buf.put_slice(len_bytes);
    }
    buf.put_slice(payload);
}

/// Peels fields off the payload of an RLP-encoded list, one at a time.
pub struct Decoder<'a> {
    payload: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(rlp: &'a [u8]) -> Result<Self, RLPDecodeError> {
        let (is_list, payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        if !rest.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok(Self { payload })
    }

    pub fn decode_field<T: RLPDecode>(self, _name: &str) -> Result<(T, Self), RLPDecodeError> {
        let (value, rest) = T::decode_unfinished(self.payload)?;
        Ok((value, Self { payload: rest }))
    }

    pub fn finish(self) -> Result<&'a [u8], RLPDecodeError> {
        if !self.payload.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok(self.payload)
    }
}
