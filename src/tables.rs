use std::num::NonZeroU64;

use deku::prelude::*;

/// One bucket of a data or field hash table.
///
/// The table is a flat array of these; an object with hash `h` belongs to
/// bucket `h % n_buckets`. Buckets with no objects hold two zeroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct HashItem {
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.head_hash_offset)"
	)]
	pub head_hash_offset: Option<NonZeroU64>,
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.tail_hash_offset)"
	)]
	pub tail_hash_offset: Option<NonZeroU64>,
}

pub const HASH_ITEM_SIZE: usize = 16;

/// Location of a hash table's payload within its journal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashTableRef {
	pub offset: u64,
	pub size: u64,
}

impl HashTableRef {
	pub const fn n_buckets(&self) -> u64 {
		self.size / HASH_ITEM_SIZE as u64
	}
}

/// Parse a whole table payload into its buckets.
pub fn parse_hash_table(bytes: &[u8]) -> std::io::Result<Vec<HashItem>> {
	if bytes.len() % HASH_ITEM_SIZE != 0 {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidData,
			format!("hash table size {} is not a multiple of {HASH_ITEM_SIZE}", bytes.len()),
		));
	}

	bytes
		.chunks_exact(HASH_ITEM_SIZE)
		.map(|chunk| {
			HashItem::from_bytes((chunk, 0))
				.map(|(_, item)| item)
				.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_buckets_parse_to_none() {
		let bytes = [0u8; 32];
		let items = parse_hash_table(&bytes).unwrap();
		assert_eq!(items.len(), 2);
		assert!(items.iter().all(|i| i.head_hash_offset.is_none() && i.tail_hash_offset.is_none()));
	}

	#[test]
	fn ragged_table_is_rejected() {
		let bytes = [0u8; 24];
		assert!(parse_hash_table(&bytes).is_err());
	}

	#[test]
	fn bucket_offsets_are_little_endian() {
		let mut bytes = [0u8; 16];
		bytes[..8].copy_from_slice(&0x1000u64.to_le_bytes());
		bytes[8..].copy_from_slice(&0x2000u64.to_le_bytes());
		let items = parse_hash_table(&bytes).unwrap();
		assert_eq!(items[0].head_hash_offset.map(NonZeroU64::get), Some(0x1000));
		assert_eq!(items[0].tail_hash_offset.map(NonZeroU64::get), Some(0x2000));
	}
}
