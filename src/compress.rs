use std::io;

use crate::objects::DataCompression;

/// Decompress a Data object payload.
///
/// Only Zstd is supported; consumers of this engine are not required to
/// handle XZ or LZ4 payloads and should skip such objects.
pub fn decompress(compression: DataCompression, payload: &[u8]) -> io::Result<Vec<u8>> {
	match compression {
		DataCompression::None => Ok(payload.to_vec()),
		DataCompression::Zstd => zstd::stream::decode_all(payload),
		DataCompression::Xz | DataCompression::Lz4 => Err(io::Error::new(
			io::ErrorKind::Unsupported,
			format!("{} decompression is not supported", compression.as_str()),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zstd_payload_roundtrips() {
		let payload = b"MESSAGE=the quick brown fox jumps over the lazy dog".repeat(20);
		let compressed = zstd::stream::encode_all(&payload[..], 0).unwrap();
		assert!(compressed.len() < payload.len());

		let out = decompress(DataCompression::Zstd, &compressed).unwrap();
		assert_eq!(out, payload);
	}

	#[test]
	fn uncompressed_passes_through() {
		let out = decompress(DataCompression::None, b"K=v").unwrap();
		assert_eq!(out, b"K=v");
	}

	#[test]
	fn xz_and_lz4_are_unsupported() {
		for compression in [DataCompression::Xz, DataCompression::Lz4] {
			let err = decompress(compression, b"anything").unwrap_err();
			assert_eq!(err.kind(), io::ErrorKind::Unsupported);
		}
	}

	#[test]
	fn garbage_zstd_is_an_error() {
		assert!(decompress(DataCompression::Zstd, b"not a zstd frame").is_err());
	}
}
