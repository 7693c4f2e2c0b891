use std::num::NonZeroU64;

use deku::prelude::*;

use super::{invalid_data, ObjectHeader};

pub const TAG_LENGTH: usize = 256 / 8;

/// The body of a sealing Tag object.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct TagObjectHeader {
	pub seqnum: NonZeroU64,
	pub epoch: u64,
	pub tag: [u8; TAG_LENGTH],
}

/// A fully loaded Tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagObject {
	pub object: ObjectHeader,
	pub header: TagObjectHeader,
}

impl TagObject {
	pub(crate) fn parse(object: ObjectHeader, body: &[u8]) -> std::io::Result<Self> {
		let (_, header) = TagObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;
		Ok(Self { object, header })
	}
}
