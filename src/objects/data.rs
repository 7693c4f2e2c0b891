use bstr::BString;
use deku::prelude::*;

use super::{invalid_data, ObjectHeader};

/// The fixed portion of a Data object after the object header.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct DataObjectHeader {
	pub hash: u64,
	pub next_hash_offset: u64,
	pub next_field_offset: u64,
	pub entry_offset: u64,
	pub entry_array_offset: u64,
	pub n_entries: u64,
}

pub const DATA_OBJECT_HEADER_SIZE: u64 = 48;

/// Extra fixed fields present in compact-layout files only.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct DataObjectCompactTail {
	pub tail_entry_array_offset: u32,
	pub tail_entry_array_n_entries: u32,
}

pub const DATA_OBJECT_COMPACT_TAIL_SIZE: u64 = 8;

/// A fully loaded Data object: one `key=value` field occurrence.
///
/// The payload is the raw on-disk bytes; when `object.compression` is not
/// `None` it must be decompressed before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
	pub object: ObjectHeader,
	pub header: DataObjectHeader,
	pub compact: Option<DataObjectCompactTail>,
	pub payload: BString,
}

impl DataObject {
	pub(crate) fn parse(object: ObjectHeader, body: &[u8], compact: bool) -> std::io::Result<Self> {
		let fixed = DATA_OBJECT_HEADER_SIZE as usize
			+ if compact { DATA_OBJECT_COMPACT_TAIL_SIZE as usize } else { 0 };
		if body.len() < fixed {
			return Err(invalid_data(format!(
				"Data object body of {} bytes is shorter than its {fixed}-byte fixed part",
				body.len()
			)));
		}

		let (_, header) = DataObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;
		let compact = if compact {
			let (_, tail) =
				DataObjectCompactTail::from_bytes((&body[DATA_OBJECT_HEADER_SIZE as usize..], 0))
					.map_err(invalid_data)?;
			Some(tail)
		} else {
			None
		};

		Ok(Self {
			object,
			header,
			compact,
			payload: BString::from(&body[fixed..]),
		})
	}
}
