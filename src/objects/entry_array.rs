use std::num::NonZeroU64;

use deku::prelude::*;

use super::{invalid_data, ObjectHeader};

/// The fixed portion of an EntryArray object after the object header.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct EntryArrayObjectHeader {
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.next_entry_array_offset)"
	)]
	pub next_entry_array_offset: Option<NonZeroU64>,
}

pub const ENTRY_ARRAY_HEADER_SIZE: u64 = 8;

/// A fully loaded EntryArray object.
///
/// Items are widened to u64 regardless of layout. Trailing zero slots are
/// kept: arrays grow ahead of use, and utilization reporting needs to see
/// the unfilled capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryArrayObject {
	pub object: ObjectHeader,
	pub header: EntryArrayObjectHeader,
	pub items: Vec<u64>,
}

impl EntryArrayObject {
	pub(crate) fn parse(object: ObjectHeader, body: &[u8], compact: bool) -> std::io::Result<Self> {
		if body.len() < ENTRY_ARRAY_HEADER_SIZE as usize {
			return Err(invalid_data(format!(
				"EntryArray object body of {} bytes is shorter than its fixed part",
				body.len()
			)));
		}

		let (_, header) = EntryArrayObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;

		let item_bytes = &body[ENTRY_ARRAY_HEADER_SIZE as usize..];
		let items = if compact {
			item_bytes
				.chunks_exact(4)
				.map(|c| u32::from_le_bytes(c.try_into().unwrap()) as u64)
				.collect()
		} else {
			item_bytes
				.chunks_exact(8)
				.map(|c| u64::from_le_bytes(c.try_into().unwrap()))
				.collect()
		};

		Ok(Self { object, header, items })
	}

	/// Number of filled slots.
	pub fn utilized(&self) -> u64 {
		self.items.iter().filter(|&&offset| offset != 0).count() as u64
	}
}
