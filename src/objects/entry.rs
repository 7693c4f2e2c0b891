use std::num::{NonZeroU128, NonZeroU64};

use deku::prelude::*;
use jiff::Timestamp;

use crate::monotonic::Monotonic;

use super::{invalid_data, ObjectHeader};

/// The fixed portion of an Entry object after the object header.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct EntryObjectHeader {
	pub seqnum: NonZeroU64,

	#[deku(
		reader = "crate::deku_helpers::reader_realtime(deku::reader)",
		writer = "crate::deku_helpers::writer_realtime(deku::writer, &self.realtime)"
	)]
	pub realtime: Timestamp,

	pub monotonic: Monotonic,
	pub boot_id: NonZeroU128,
	pub xor_hash: u64,
}

pub const ENTRY_OBJECT_HEADER_SIZE: u64 = 48;

/// One item of an entry: a reference to a Data object.
///
/// Regular-layout files store a content hash beside each offset; compact
/// files store the offset alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryItem {
	pub object_offset: u64,
	pub hash: Option<u64>,
}

/// A fully loaded Entry object: one logged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryObject {
	pub object: ObjectHeader,
	pub header: EntryObjectHeader,
	pub items: Vec<EntryItem>,
}

impl EntryObject {
	pub(crate) fn parse(object: ObjectHeader, body: &[u8], compact: bool) -> std::io::Result<Self> {
		if body.len() < ENTRY_OBJECT_HEADER_SIZE as usize {
			return Err(invalid_data(format!(
				"Entry object body of {} bytes is shorter than its fixed part",
				body.len()
			)));
		}

		let (_, header) = EntryObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;

		let item_bytes = &body[ENTRY_OBJECT_HEADER_SIZE as usize..];
		let mut items = Vec::new();
		if compact {
			for chunk in item_bytes.chunks_exact(4) {
				let object_offset = u32::from_le_bytes(chunk.try_into().unwrap()) as u64;
				if object_offset == 0 {
					break;
				}
				items.push(EntryItem { object_offset, hash: None });
			}
		} else {
			for chunk in item_bytes.chunks_exact(16) {
				let object_offset = u64::from_le_bytes(chunk[..8].try_into().unwrap());
				if object_offset == 0 {
					break;
				}
				let hash = u64::from_le_bytes(chunk[8..].try_into().unwrap());
				items.push(EntryItem { object_offset, hash: Some(hash) });
			}
		}

		Ok(Self { object, header, items })
	}
}
