use deku::prelude::*;

/// Tag byte of every object in a journal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
pub enum ObjectType {
	/// Pre-allocated arena space not yet holding an object.
	#[deku(id = "0")]
	Unused,

	/// One field occurrence of an entry, i.e. a string such as
	/// `_SYSTEMD_UNIT=avahi-daemon.service` or `MESSAGE=Foo had a booboo`.
	#[deku(id = "1")]
	Data,

	/// A field name, i.e. a string such as `_SYSTEMD_UNIT` or `MESSAGE`,
	/// without any `=` or value.
	#[deku(id = "2")]
	Field,

	/// Binds several `Data` objects together into a log entry.
	#[deku(id = "3")]
	Entry,

	/// Hash table for finding existing `Data` objects.
	#[deku(id = "4")]
	DataHashTable,

	/// Hash table for finding existing `Field` objects.
	#[deku(id = "5")]
	FieldHashTable,

	/// Sorted array of offsets to entries, used for seeking by binary search.
	#[deku(id = "6")]
	EntryArray,

	/// Forward Secure Sealing tag covering all data since the previous tag.
	#[deku(id = "7")]
	Tag,

	/// A type this crate does not know; carried through iteration untouched.
	#[deku(id_pat = "_")]
	Unknown(u8),
}

impl ObjectType {
	/// Single-letter code used by the layout report.
	pub const fn type_char(self) -> char {
		match self {
			ObjectType::Unused | ObjectType::Unknown(_) => '?',
			ObjectType::Data => 'd',
			ObjectType::Field => 'f',
			ObjectType::Entry => 'e',
			ObjectType::DataHashTable => 'D',
			ObjectType::FieldHashTable => 'F',
			ObjectType::EntryArray => 'A',
			ObjectType::Tag => 'T',
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			ObjectType::Unused => "UNUSED",
			ObjectType::Data => "Data",
			ObjectType::Field => "Field",
			ObjectType::Entry => "Entry",
			ObjectType::DataHashTable => "DataHashTable",
			ObjectType::FieldHashTable => "FieldHashTable",
			ObjectType::EntryArray => "EntryArray",
			ObjectType::Tag => "Tag",
			ObjectType::Unknown(_) => "UNKNOWN",
		}
	}
}

/// Compression applied to a Data object's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[repr(u8)]
#[rustfmt::skip]
pub enum DataCompression {
	None = 0b000,
	Xz   = 0b__1,
	Lz4  = 0b_10,
	Zstd = 0b100,
}

impl DataCompression {
	pub const fn as_str(self) -> &'static str {
		match self {
			DataCompression::None => "none",
			DataCompression::Xz => "XZ",
			DataCompression::Lz4 => "LZ4",
			DataCompression::Zstd => "Zstd",
		}
	}
}

/// The common 16-byte prefix of every object.
///
/// `size` covers the whole object, this header included. A zero size marks
/// the remainder of the file as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct ObjectHeader {
	pub r#type: ObjectType,

	#[deku(pad_bytes_after = "6")]
	pub compression: DataCompression,

	pub size: u64,
}

pub const OBJECT_HEADER_SIZE: u64 = 16;

impl ObjectHeader {
	pub fn parse(bytes: &[u8]) -> std::io::Result<Self> {
		let (_, header) = ObjectHeader::from_bytes((bytes, 0))
			.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
		Ok(header)
	}

	pub const fn payload_size(&self) -> u64 {
		self.size.saturating_sub(OBJECT_HEADER_SIZE)
	}
}

/// Round a size up to the 8-byte object alignment.
pub const fn align64(size: u64) -> u64 {
	(size + 7) & !7
}
