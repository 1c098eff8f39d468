//! Gzip framing for evidence payloads.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Compress bytes at best compression. Evidence objects are written once and
/// read rarely.
pub fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a gzip stream.
pub fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let input = b"<html><body>evidence payload</body></html>".repeat(50);
        let compressed = compress(&input).unwrap();
        assert!(compressed.len() < input.len());
        assert_eq!(decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn decompress_rejects_garbage() {
        assert!(decompress(b"not gzip at all").is_err());
    }
}
