use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProbeError;

const HEADER_LEN: usize = 4;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frames the EPP wire format: a 4-byte big-endian total length (header included) followed
/// by the XML payload. Blocks the pipeline until a complete frame is buffered.
#[derive(Debug, Default)]
pub struct EppCodec;

impl Decoder for EppCodec {
	type Item = Vec<u8>;
	type Error = ProbeError;

	fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
		if src.len() < HEADER_LEN {
			return Ok(None);
		}
		let total_len = u32::from_be_bytes(src[..HEADER_LEN].try_into().unwrap()) as usize;
		if total_len < HEADER_LEN {
			return Err(ProbeError::Decode(format!(
				"frame length {total_len} is shorter than the {HEADER_LEN}-byte header"
			)));
		}
		if total_len > MAX_FRAME_LEN {
			return Err(ProbeError::Decode(format!(
				"frame length {total_len} exceeds the maximum of {MAX_FRAME_LEN}"
			)));
		}
		if src.len() < total_len {
			src.reserve(total_len - src.len());
			return Ok(None);
		}
		src.advance(HEADER_LEN);
		let payload = src.split_to(total_len - HEADER_LEN);
		Ok(Some(payload.to_vec()))
	}
}

impl Encoder<Vec<u8>> for EppCodec {
	type Error = ProbeError;

	fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
		let total_len = item.len() + HEADER_LEN;
		dst.reserve(total_len);
		dst.put_u32(total_len as u32);
		dst.extend_from_slice(&item);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_frame() {
		let mut codec = EppCodec;
		let mut buf = BytesMut::new();
		codec.encode(b"<epp/>".to_vec(), &mut buf).unwrap();
		assert_eq!(buf.len(), HEADER_LEN + 6);
		let decoded = codec.decode(&mut buf).unwrap().unwrap();
		assert_eq!(decoded, b"<epp/>");
		assert!(buf.is_empty());
	}

	#[test]
	fn waits_for_a_complete_frame() {
		let mut codec = EppCodec;
		let mut buf = BytesMut::new();
		buf.extend_from_slice(&10u32.to_be_bytes());
		buf.extend_from_slice(b"ab");
		assert!(codec.decode(&mut buf).unwrap().is_none());
		buf.extend_from_slice(b"cdef");
		let decoded = codec.decode(&mut buf).unwrap().unwrap();
		assert_eq!(decoded, b"abcdef");
	}

	#[test]
	fn rejects_a_header_shorter_than_itself() {
		let mut codec = EppCodec;
		let mut buf = BytesMut::new();
		buf.extend_from_slice(&2u32.to_be_bytes());
		assert!(codec.decode(&mut buf).is_err());
	}
}
