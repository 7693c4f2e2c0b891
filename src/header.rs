use std::num::{NonZeroU128, NonZeroU32, NonZeroU64};

use deku::{ctx::Endian, no_std_io, prelude::*};
use flagset::{flags, FlagSet};
use jiff::Timestamp;

use crate::tables::{HashTableRef, HASH_ITEM_SIZE};

/// The fixed file header at offset 0 of every journal file.
///
/// All integer fields are little-endian on disk. Fields past offset 208 are
/// present only when `header_size` says so; older files simply end earlier.
#[derive(Debug, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little", magic = b"LPKSHHRH")]
pub struct Header {
	/// Feature flags a reader may ignore without harm.
	#[deku(
		reader = "CompatibleFlag::deku_reader(deku::reader)",
		writer = "CompatibleFlag::deku_writer(deku::writer, &self.compatible_flags)"
	)]
	pub compatible_flags: FlagSet<CompatibleFlag>, // 4 = 12

	/// Feature flags a reader must understand to interpret the file at all.
	#[deku(
		reader = "IncompatibleFlag::deku_reader(deku::reader)",
		writer = "IncompatibleFlag::deku_writer(deku::writer, &self.incompatible_flags)"
	)]
	pub incompatible_flags: FlagSet<IncompatibleFlag>, // 4 = 16

	/// Whether the file is offline, online, or archived.
	///
	/// Archived is the only state eligible for tail truncation.
	#[deku(pad_bytes_after = "7")]
	pub state: State, // 8 = 24

	/// Random identifier unique to this file, assigned at creation.
	///
	/// Also the key for the keyed hash function when [`IncompatibleFlag::KeyedHash`]
	/// is set.
	pub file_id: u128, // 16 = 40

	/// Identifier of the machine that owns the journal.
	pub machine_id: u128, // 16 = 56

	/// Boot ID of the last entry written, zero while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u128(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u128(deku::writer, &self.tail_entry_boot_id)"
	)]
	pub tail_entry_boot_id: Option<NonZeroU128>, // 16 = 72

	/// Identifier of the sequence-number domain shared by related files.
	pub seqnum_id: NonZeroU128, // 16 = 88

	/// Size of this header in bytes; objects start here.
	pub header_size: NonZeroU64, // 8 = 96

	/// Allocated size of the file after the header.
	pub arena_size: NonZeroU64, // 8 = 104

	/// Offset of the data hash table object's payload.
	pub data_hash_table_offset: NonZeroU64, // 8 = 112

	/// Size of the data hash table payload in bytes.
	pub data_hash_table_size: NonZeroU64, // 8 = 120

	/// Offset of the field hash table object's payload.
	pub field_hash_table_offset: NonZeroU64, // 8 = 128

	/// Size of the field hash table payload in bytes.
	pub field_hash_table_size: NonZeroU64, // 8 = 136

	/// Offset of the last object in the file.
	pub tail_object_offset: NonZeroU64, // 8 = 144

	/// Number of objects in the file, hash tables included.
	pub n_objects: NonZeroU64, // 8 = 152

	/// Number of entry objects in the file.
	pub n_entries: u64, // 8 = 160

	/// Sequence number of the last entry, zero while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.tail_entry_seqnum)"
	)]
	pub tail_entry_seqnum: Option<NonZeroU64>, // 8 = 168

	/// Sequence number of the first entry, zero while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.head_entry_seqnum)"
	)]
	pub head_entry_seqnum: Option<NonZeroU64>, // 8 = 176

	/// Offset of the first entry array in the file.
	pub entry_array_offset: NonZeroU64, // 8 = 184

	/// Wallclock timestamp of the first entry, absent while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_realtime_opt(deku::reader)",
		writer = "crate::deku_helpers::writer_realtime_opt(deku::writer, &self.head_entry_realtime)"
	)]
	pub head_entry_realtime: Option<Timestamp>, // 8 = 192

	/// Wallclock timestamp of the last entry, absent while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_realtime_opt(deku::reader)",
		writer = "crate::deku_helpers::writer_realtime_opt(deku::writer, &self.tail_entry_realtime)"
	)]
	pub tail_entry_realtime: Option<Timestamp>, // 8 = 200

	/// Monotonic timestamp of the last entry, absent while the file is empty.
	#[deku(
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.tail_entry_monotonic)"
	)]
	pub tail_entry_monotonic: Option<NonZeroU64>, // 8 = 208

	/// Number of data objects, absent in very old files.
	#[deku(cond = "header_size.get() > 208")]
	pub n_data: Option<u64>, // 8 = 216

	/// Number of field objects, absent in very old files.
	#[deku(cond = "header_size.get() > 216")]
	pub n_fields: Option<u64>, // 8 = 224

	/// Number of sealing tag objects.
	#[deku(cond = "header_size.get() > 224")]
	pub n_tags: Option<u64>, // 8 = 232

	/// Number of entry array objects.
	#[deku(cond = "header_size.get() > 232")]
	pub n_entry_arrays: Option<u64>, // 8 = 240

	/// Longest collision chain in the data hash table.
	#[deku(cond = "header_size.get() > 240")]
	pub data_hash_chain_depth: Option<u64>, // 8 = 248

	/// Longest collision chain in the field hash table.
	#[deku(cond = "header_size.get() > 248")]
	pub field_hash_chain_depth: Option<u64>, // 8 = 256

	/// Offset of the last entry array in the file.
	#[deku(
		cond = "header_size.get() > 256",
		reader = "crate::deku_helpers::reader_nonzero_u32(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u32(deku::writer, &self.tail_entry_array_offset)"
	)]
	pub tail_entry_array_offset: Option<NonZeroU32>, // 4 = 260

	/// Number of entries in the last entry array.
	#[deku(
		cond = "header_size.get() > 260",
		reader = "crate::deku_helpers::reader_nonzero_u32(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u32(deku::writer, &self.tail_entry_array_n_entries)"
	)]
	pub tail_entry_array_n_entries: Option<NonZeroU32>, // 4 = 264

	/// Offset of the last entry in the file.
	#[deku(
		cond = "header_size.get() > 264",
		reader = "crate::deku_helpers::reader_nonzero_u64(deku::reader)",
		writer = "crate::deku_helpers::writer_nonzero_u64(deku::writer, &self.tail_entry_offset)"
	)]
	pub tail_entry_offset: Option<NonZeroU64>, // 8 = 272
}

pub const MIN_HEADER_SIZE: usize = 208;
pub const MAX_HEADER_SIZE: usize = 272;

impl Header {
	/// Parse a header from the first bytes of a journal file.
	pub fn parse(bytes: &[u8]) -> std::io::Result<Self> {
		let (_, header) = Header::from_bytes((bytes, 0))
			.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
		Ok(header)
	}

	/// Whether the file uses the compact binary layout (u32 entry references).
	pub fn is_compact(&self) -> bool {
		self.incompatible_flags.contains(IncompatibleFlag::Compact)
	}

	/// Whether hashed objects use the keyed SipHash-2-4 rather than lookup3.
	pub fn is_keyed_hash(&self) -> bool {
		self.incompatible_flags.contains(IncompatibleFlag::KeyedHash)
	}

	pub fn data_hash_table(&self) -> HashTableRef {
		HashTableRef {
			offset: self.data_hash_table_offset.get(),
			size: self.data_hash_table_size.get(),
		}
	}

	pub fn field_hash_table(&self) -> HashTableRef {
		HashTableRef {
			offset: self.field_hash_table_offset.get(),
			size: self.field_hash_table_size.get(),
		}
	}

	/// On-disk size of one item in an entry object's item array.
	pub fn sizeof_entry_item(&self) -> u64 {
		if self.is_compact() {
			4
		} else {
			16
		}
	}

	/// On-disk size of one item in an entry array object.
	pub fn sizeof_entry_array_item(&self) -> u64 {
		if self.is_compact() {
			4
		} else {
			8
		}
	}
}

flags! {
	/// Feature flags that can be ignored if not understood.
	pub enum CompatibleFlag: u32 {
		/// The file carries `Tag` objects for Forward Secure Sealing.
		Sealed           = 0b__1,

		/// `tail_entry_boot_id` is only updated on creation and entry writes,
		/// never on archival.
		TailEntryBootId  = 0b_10,

		/// Sealing happens once per epoch.
		SealedContinuous = 0b100,
	}

	/// Feature flags that must be understood for compatibility.
	///
	/// A reader that meets an unknown incompatible flag must refuse the file.
	pub enum IncompatibleFlag: u32 {
		/// Some `Data` payloads are XZ-compressed.
		CompressedXz   = 0b____1,

		/// Some `Data` payloads are LZ4-compressed.
		CompressedLz4  = 0b___10,

		/// Hashed objects use SipHash-2-4 keyed by `file_id`.
		KeyedHash      = 0b__100,

		/// Some `Data` payloads are Zstd-compressed.
		CompressedZstd = 0b_1000,

		/// The file uses the compact binary layout.
		Compact        = 0b10000,
	}
}

impl CompatibleFlag {
	fn deku_reader<R: no_std_io::Read + no_std_io::Seek>(
		reader: &mut Reader<R>,
	) -> Result<FlagSet<Self>, DekuError> {
		let value = u32::from_reader_with_ctx(reader, Endian::Little)?;
		Ok(FlagSet::new_truncated(value))
	}

	fn deku_writer<W: std::io::Write + std::io::Seek>(
		writer: &mut Writer<W>,
		field: &FlagSet<Self>,
	) -> Result<(), DekuError> {
		field.bits().to_writer(writer, Endian::Little)
	}
}

impl IncompatibleFlag {
	fn deku_reader<R: no_std_io::Read + no_std_io::Seek>(
		reader: &mut Reader<R>,
	) -> Result<FlagSet<Self>, DekuError> {
		let value = u32::from_reader_with_ctx(reader, Endian::Little)?;
		FlagSet::new(value).map_err(|_| DekuError::Assertion("Unknown incompatible flags".into()))
	}

	fn deku_writer<W: std::io::Write + std::io::Seek>(
		writer: &mut Writer<W>,
		field: &FlagSet<Self>,
	) -> Result<(), DekuError> {
		field.bits().to_writer(writer, Endian::Little)
	}
}

/// The read/write state of a journal file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[repr(u8)]
pub enum State {
	/// Closed for writing.
	Offline = 0,

	/// Open for writing.
	Online = 1,

	/// Closed for writing and rotated away from; appends will never resume.
	Archived = 2,
}

impl State {
	pub const fn as_str(self) -> &'static str {
		match self {
			State::Offline => "Offline",
			State::Online => "Online",
			State::Archived => "Archived",
		}
	}
}
