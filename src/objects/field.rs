use bstr::BString;
use deku::prelude::*;

use super::{invalid_data, ObjectHeader};

/// The fixed portion of a Field object after the object header.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct FieldObjectHeader {
	pub hash: u64,
	pub next_hash_offset: u64,
	pub head_data_offset: u64,
}

pub const FIELD_OBJECT_HEADER_SIZE: u64 = 24;

/// A fully loaded Field object: a field name without `=` or value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldObject {
	pub object: ObjectHeader,
	pub header: FieldObjectHeader,
	pub payload: BString,
}

impl FieldObject {
	pub(crate) fn parse(object: ObjectHeader, body: &[u8]) -> std::io::Result<Self> {
		if body.len() < FIELD_OBJECT_HEADER_SIZE as usize {
			return Err(invalid_data(format!(
				"Field object body of {} bytes is shorter than its fixed part",
				body.len()
			)));
		}

		let (_, header) = FieldObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;

		Ok(Self {
			object,
			header,
			payload: BString::from(&body[FIELD_OBJECT_HEADER_SIZE as usize..]),
		})
	}
}
