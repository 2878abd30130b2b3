//! Size-adaptive compression for stored payloads.
//!
//! Compresses a value only when doing so is actually worth it: the raw
//! payload must exceed `compression_threshold` bytes AND the resulting
//! ratio must meet `compression_ratio_target`, otherwise the payload is
//! stored raw. DEFLATE (zlib framing) is used throughout, matching the
//! reference implementation's choice.

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// The outcome of a compression decision for one payload.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// The bytes actually stored: raw if `compressed` is false,
    /// DEFLATE-compressed otherwise.
    pub bytes: Bytes,
    /// Whether `bytes` holds compressed data.
    pub compressed: bool,
    /// Size of the original, uncompressed payload.
    pub logical_size: usize,
    /// Size `bytes` actually occupies (equals `logical_size` when raw).
    pub stored_size: usize,
}

/// Compresses `data` if it pays off; otherwise returns it unchanged.
///
/// `compression_threshold` is the minimum logical size (bytes) to even
/// consider compression. `ratio_target` is the maximum acceptable
/// `compressed_size / logical_size` ratio; compression is discarded if
/// it does not beat this target.
///
/// # Errors
///
/// Returns [`Error::CodecFailure`] if the underlying DEFLATE encoder
/// fails (an allocation failure or similar fatal library error; a
/// well-formed input byte slice never triggers this in practice).
pub fn encode(
    data: &[u8],
    compression_threshold: usize,
    ratio_target: f64,
) -> Result<EncodedPayload> {
    let logical_size = data.len();

    if logical_size <= compression_threshold {
        return Ok(raw(data));
    }

    let compressed = compress(data)?;

    #[allow(clippy::cast_precision_loss)]
    let ratio = compressed.len() as f64 / logical_size as f64;

    if ratio <= ratio_target {
        let stored_size = compressed.len();
        Ok(EncodedPayload {
            bytes: Bytes::from(compressed),
            compressed: true,
            logical_size,
            stored_size,
        })
    } else {
        Ok(raw(data))
    }
}

/// Decompresses a payload previously produced by [`encode`] with
/// `compressed == true`. Calling this on raw bytes is a logic error in
/// the caller (the `Entry` carries its own `compressed` tag) and is
/// therefore not handled here.
///
/// # Errors
///
/// Returns [`Error::CodecFailure`] if `data` is not valid DEFLATE
/// output (library/data corruption).
pub fn decompress(data: &[u8]) -> Result<Bytes> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::CodecFailure(e.to_string()))?;
    Ok(Bytes::from(out))
}

fn raw(data: &[u8]) -> EncodedPayload {
    EncodedPayload {
        bytes: Bytes::copy_from_slice(data),
        compressed: false,
        logical_size: data.len(),
        stored_size: data.len(),
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::CodecFailure(e.to_string()))?;
    encoder.finish().map_err(|e| Error::CodecFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_stays_raw() {
        let data = b"short";
        let out = encode(data, 1024, 0.7).unwrap();
        assert!(!out.compressed);
        assert_eq!(out.bytes.as_ref(), data);
        assert_eq!(out.logical_size, out.stored_size);
    }

    #[test]
    fn highly_compressible_payload_is_compressed() {
        let data = vec![b'a'; 100 * 1024];
        let out = encode(&data, 1024, 0.7).unwrap();
        assert!(out.compressed);
        assert!(out.stored_size < out.logical_size);

        let roundtrip = decompress(&out.bytes).unwrap();
        assert_eq!(roundtrip.as_ref(), data.as_slice());
    }

    #[test]
    fn incompressible_payload_above_threshold_falls_back_to_raw() {
        // Pseudo-random bytes rarely compress below any sane ratio target.
        let mut data = vec![0u8; 8 * 1024];
        for (i, b) in data.iter_mut().enumerate() {
            *b = ((i * 2654435761) % 251) as u8;
        }
        let out = encode(&data, 1024, 0.01).unwrap();
        assert!(!out.compressed);
        assert_eq!(out.bytes.as_ref(), data.as_slice());
    }

    #[test]
    fn ratio_target_gates_acceptance() {
        let data = vec![b'x'; 10 * 1024];
        // A permissive ratio accepts compression.
        let permissive = encode(&data, 1024, 0.99).unwrap();
        assert!(permissive.compressed);
        // An unreachable ratio rejects it even though compression succeeded.
        let strict = encode(&data, 1024, 0.0001).unwrap();
        assert!(!strict.compressed);
    }
}
