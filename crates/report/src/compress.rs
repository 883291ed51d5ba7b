//! Payload compression for the HTML report.
//!
//! The result payload is compact JSON, zlib-compressed and base64-encoded
//! so it can sit inside a `<script>` tag. The client side reverses this
//! with `atob` and the browser-native `DecompressionStream('deflate')`,
//! which speaks exactly the zlib framing `flate2` writes here.

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use glasshouse_common::{Error, Result};

/// zlib level 6: the bulk of the win at a fraction of level 9's cost.
const COMPRESSION_LEVEL: u32 = 6;

/// Serialize a value to compact JSON, compress and base64-encode it.
pub fn compress_payload<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder
        .write_all(&json)
        .map_err(|e| Error::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))?;
    Ok(STANDARD.encode(compressed))
}

/// Exact inverse of [`compress_payload`].
pub fn decompress_payload<T: serde::de::DeserializeOwned>(encoded: &str) -> Result<T> {
    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Compression(e.to_string()))?;
    let mut decoder = ZlibDecoder::new(Vec::new());
    decoder
        .write_all(&compressed)
        .map_err(|e| Error::Compression(e.to_string()))?;
    let json = decoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        values: Vec<f64>,
    }

    #[test]
    fn payload_round_trips() {
        let payload = Payload {
            name: "checkout-flow".to_string(),
            values: vec![1.5, 2.25, 0.0],
        };
        let encoded = compress_payload(&payload).unwrap();
        let back: Payload = decompress_payload(&encoded).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn repetitive_payloads_shrink() {
        let rows: Vec<String> = (0..500).map(|_| "passed".to_string()).collect();
        let encoded = compress_payload(&rows).unwrap();
        let raw_len = serde_json::to_vec(&rows).unwrap().len();
        assert!(encoded.len() < raw_len / 4);
    }

    #[test]
    fn encoded_payload_carries_zlib_framing() {
        let encoded = compress_payload(&"x").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        // 0x78 is the zlib CMF byte DecompressionStream('deflate') expects.
        assert_eq!(bytes[0], 0x78);
    }

    #[test]
    fn garbage_input_is_a_compression_error() {
        let err = decompress_payload::<String>("not base64!!!").unwrap_err();
        assert!(matches!(err, Error::Compression(_)));
    }
}
