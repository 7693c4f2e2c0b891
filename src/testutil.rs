//! Builds small but structurally honest journal files for tests: real
//! hashes, linked hash-table chains, an entry and its entry array, correct
//! counters. Regular (non-compact) layout only.

use std::num::{NonZeroU128, NonZeroU32, NonZeroU64};

use deku::DekuContainerWrite as _;
use flagset::FlagSet;
use jiff::Timestamp;

use crate::{
	hashes::hash_payload,
	header::{CompatibleFlag, Header, IncompatibleFlag, State, MAX_HEADER_SIZE},
	monotonic::Monotonic,
	objects::{
		align64, DataCompression, DataObjectHeader, EntryArrayObjectHeader, EntryObjectHeader,
		FieldObjectHeader, ObjectHeader, ObjectType, DATA_OBJECT_HEADER_SIZE,
		ENTRY_ARRAY_HEADER_SIZE, ENTRY_OBJECT_HEADER_SIZE, FIELD_OBJECT_HEADER_SIZE,
		OBJECT_HEADER_SIZE,
	},
	tables::HASH_ITEM_SIZE,
};

pub const FILE_ID: u128 = 0x0102030405060708090a0b0c0d0e0f10;
pub const MACHINE_ID: u128 = 0xc9913ba84414_20af_b045_8d03_1cc744c4;
pub const BOOT_ID: u128 = 0x98c67240fb8eca8ebe4a8055afa8ed82;

const N_BUCKETS: u64 = 4;

pub struct JournalBuilder {
	state: State,
	keyed: bool,
	datas: Vec<(Vec<u8>, DataCompression)>,
	tail_padding: u64,
	corrupt_after: Option<usize>,
	extra_array_slots: u64,
	duplicate_entry_array: bool,
}

/// A built journal plus everything a test needs to assert about it.
pub struct Fixture {
	pub bytes: Vec<u8>,
	pub object_offsets: Vec<(u64, ObjectType, u64)>,
	pub field_offsets: Vec<u64>,
	pub data_offsets: Vec<u64>,
	pub entry_offset: u64,
	pub entry_array_offsets: Vec<u64>,
	pub tail_object_offset: u64,
	pub n_objects: u64,
}

impl Fixture {
	pub fn cursor(&self) -> futures_util::io::Cursor<Vec<u8>> {
		futures_util::io::Cursor::new(self.bytes.clone())
	}
}

struct PlannedObject {
	offset: u64,
	size: u64,
	r#type: ObjectType,
	compression: DataCompression,
	body: Vec<u8>,
}

impl JournalBuilder {
	pub fn new() -> Self {
		Self {
			state: State::Offline,
			keyed: true,
			datas: vec![
				(b"MESSAGE=first message".to_vec(), DataCompression::None),
				(b"MESSAGE=second message".to_vec(), DataCompression::None),
				(b"PRIORITY=6".to_vec(), DataCompression::None),
			],
			tail_padding: 0,
			corrupt_after: None,
			extra_array_slots: 0,
			duplicate_entry_array: false,
		}
	}

	pub fn state(mut self, state: State) -> Self {
		self.state = state;
		self
	}

	pub fn keyed(mut self, keyed: bool) -> Self {
		self.keyed = keyed;
		self
	}

	pub fn datas(mut self, datas: Vec<(Vec<u8>, DataCompression)>) -> Self {
		self.datas = datas;
		self
	}

	/// Bytes of unreclaimed space appended after the tail object.
	pub fn tail_padding(mut self, padding: u64) -> Self {
		self.tail_padding = padding;
		self
	}

	/// Plant a zero-sized object after the n-th real object.
	pub fn corrupt_after(mut self, n: usize) -> Self {
		self.corrupt_after = Some(n);
		self
	}

	/// Unfilled slots appended to the entry array.
	pub fn extra_array_slots(mut self, slots: u64) -> Self {
		self.extra_array_slots = slots;
		self
	}

	/// Chain a second entry array with an identical payload.
	pub fn duplicate_entry_array(mut self) -> Self {
		self.duplicate_entry_array = true;
		self
	}

	pub fn build(self) -> Fixture {
		let field_names: Vec<Vec<u8>> = {
			let mut names: Vec<Vec<u8>> = Vec::new();
			for (payload, _) in &self.datas {
				let name = payload.split(|&b| b == b'=').next().unwrap().to_vec();
				if !names.contains(&name) {
					names.push(name);
				}
			}
			names
		};

		let stored_datas: Vec<Vec<u8>> = self
			.datas
			.iter()
			.map(|(payload, compression)| match compression {
				DataCompression::Zstd => zstd::stream::encode_all(&payload[..], 0).unwrap(),
				DataCompression::None => payload.clone(),
				other => panic!("fixture cannot compress with {}", other.as_str()),
			})
			.collect();

		let data_hashes: Vec<u64> = self
			.datas
			.iter()
			.map(|(payload, _)| hash_payload(self.keyed, FILE_ID, payload))
			.collect();
		let field_hashes: Vec<u64> = field_names
			.iter()
			.map(|name| hash_payload(self.keyed, FILE_ID, name))
			.collect();

		// Lay out objects: both hash tables, fields, datas, one entry, one
		// or two entry arrays.
		let table_size = N_BUCKETS * HASH_ITEM_SIZE as u64;
		let n_array_slots = 1 + self.extra_array_slots;

		let mut sizes: Vec<(ObjectType, u64)> = Vec::new();
		sizes.push((ObjectType::FieldHashTable, OBJECT_HEADER_SIZE + table_size));
		sizes.push((ObjectType::DataHashTable, OBJECT_HEADER_SIZE + table_size));
		for name in &field_names {
			sizes.push((
				ObjectType::Field,
				OBJECT_HEADER_SIZE + FIELD_OBJECT_HEADER_SIZE + name.len() as u64,
			));
		}
		for stored in &stored_datas {
			sizes.push((
				ObjectType::Data,
				OBJECT_HEADER_SIZE + DATA_OBJECT_HEADER_SIZE + stored.len() as u64,
			));
		}
		sizes.push((
			ObjectType::Entry,
			OBJECT_HEADER_SIZE + ENTRY_OBJECT_HEADER_SIZE + 16 * self.datas.len() as u64,
		));
		let n_entry_arrays = if self.duplicate_entry_array { 2 } else { 1 };
		for _ in 0..n_entry_arrays {
			sizes.push((
				ObjectType::EntryArray,
				OBJECT_HEADER_SIZE + ENTRY_ARRAY_HEADER_SIZE + 8 * n_array_slots,
			));
		}

		let mut offsets = Vec::with_capacity(sizes.len());
		let mut cursor = MAX_HEADER_SIZE as u64;
		for (i, (_, size)) in sizes.iter().enumerate() {
			if self.corrupt_after == Some(i) {
				// The zero-sized marker occupies an aligned header's worth.
				cursor += OBJECT_HEADER_SIZE;
			}
			offsets.push(cursor);
			cursor += align64(*size);
		}
		let file_len = cursor;

		let field_table_offset = offsets[0];
		let data_table_offset = offsets[1];
		let field_offsets = &offsets[2..2 + field_names.len()];
		let data_offsets = &offsets[2 + field_names.len()..2 + field_names.len() + self.datas.len()];
		let entry_offset = offsets[2 + field_names.len() + self.datas.len()];
		let entry_array_offsets = &offsets[offsets.len() - n_entry_arrays..];

		// Bucket chains, in insertion order.
		let chain = |hashes: &[u64], object_offsets: &[u64]| {
			let mut buckets: Vec<Vec<u64>> = vec![Vec::new(); N_BUCKETS as usize];
			for (hash, &offset) in hashes.iter().zip(object_offsets) {
				buckets[(hash % N_BUCKETS) as usize].push(offset);
			}
			let mut table = Vec::new();
			for bucket in &buckets {
				let mut item = [0u8; HASH_ITEM_SIZE];
				if let (Some(&head), Some(&tail)) = (bucket.first(), bucket.last()) {
					item[..8].copy_from_slice(&head.to_le_bytes());
					item[8..].copy_from_slice(&tail.to_le_bytes());
				}
				table.extend_from_slice(&item);
			}
			let depth = buckets.iter().map(Vec::len).max().unwrap_or(0) as u64;
			(table, buckets, depth)
		};
		let (field_table, field_buckets, field_depth) = chain(&field_hashes, field_offsets);
		let (data_table, data_buckets, data_depth) = chain(&data_hashes, data_offsets);
		let next_in = |buckets: &Vec<Vec<u64>>, offset: u64| -> u64 {
			for bucket in buckets {
				if let Some(at) = bucket.iter().position(|&o| o == offset) {
					return bucket.get(at + 1).copied().unwrap_or(0);
				}
			}
			0
		};

		// Assemble object bodies.
		let mut planned: Vec<PlannedObject> = Vec::new();
		let push = |planned: &mut Vec<PlannedObject>,
		            at: usize,
		            compression: DataCompression,
		            body: Vec<u8>| {
			let (r#type, size) = sizes[at];
			debug_assert_eq!(size, OBJECT_HEADER_SIZE + body.len() as u64);
			planned.push(PlannedObject {
				offset: offsets[at],
				size,
				r#type,
				compression,
				body,
			});
		};

		push(&mut planned, 0, DataCompression::None, field_table);
		push(&mut planned, 1, DataCompression::None, data_table);

		for (i, name) in field_names.iter().enumerate() {
			let head_data = self
				.datas
				.iter()
				.position(|(payload, _)| payload.starts_with(name) && payload.get(name.len()) == Some(&b'='))
				.map(|at| data_offsets[at])
				.unwrap_or(0);
			let header = FieldObjectHeader {
				hash: field_hashes[i],
				next_hash_offset: next_in(&field_buckets, field_offsets[i]),
				head_data_offset: head_data,
			};
			let mut body = header.to_bytes().unwrap();
			body.extend_from_slice(name);
			push(&mut planned, 2 + i, DataCompression::None, body);
		}

		for (i, stored) in stored_datas.iter().enumerate() {
			let header = DataObjectHeader {
				hash: data_hashes[i],
				next_hash_offset: next_in(&data_buckets, data_offsets[i]),
				next_field_offset: 0,
				entry_offset,
				entry_array_offset: 0,
				n_entries: 1,
			};
			let mut body = header.to_bytes().unwrap();
			body.extend_from_slice(stored);
			push(
				&mut planned,
				2 + field_names.len() + i,
				self.datas[i].1,
				body,
			);
		}

		let realtime: Timestamp = "2024-10-01T10:45:31.788676Z".parse().unwrap();
		let entry_header = EntryObjectHeader {
			seqnum: NonZeroU64::new(1).unwrap(),
			realtime,
			monotonic: Monotonic::new(370_782_072_822),
			boot_id: NonZeroU128::new(BOOT_ID).unwrap(),
			xor_hash: data_hashes.iter().fold(0, |acc, h| acc ^ h),
		};
		let mut entry_body = entry_header.to_bytes().unwrap();
		for (i, &offset) in data_offsets.iter().enumerate() {
			entry_body.extend_from_slice(&offset.to_le_bytes());
			entry_body.extend_from_slice(&data_hashes[i].to_le_bytes());
		}
		push(
			&mut planned,
			2 + field_names.len() + self.datas.len(),
			DataCompression::None,
			entry_body,
		);

		for (i, &ea_offset) in entry_array_offsets.iter().enumerate() {
			let next = entry_array_offsets.get(i + 1).copied().unwrap_or(0);
			let header = EntryArrayObjectHeader {
				next_entry_array_offset: NonZeroU64::new(next),
			};
			let mut body = header.to_bytes().unwrap();
			body.extend_from_slice(&entry_offset.to_le_bytes());
			for _ in 0..self.extra_array_slots {
				body.extend_from_slice(&0u64.to_le_bytes());
			}
			let at = offsets.iter().position(|&o| o == ea_offset).unwrap();
			push(&mut planned, at, DataCompression::None, body);
		}

		// Header.
		let any_zstd = self
			.datas
			.iter()
			.any(|(_, compression)| *compression == DataCompression::Zstd);
		let mut incompatible: FlagSet<IncompatibleFlag> = Default::default();
		if self.keyed {
			incompatible |= IncompatibleFlag::KeyedHash;
		}
		if any_zstd {
			incompatible |= IncompatibleFlag::CompressedZstd;
		}

		let tail_object_offset = *offsets.last().unwrap();
		let n_objects = sizes.len() as u64;
		let header = Header {
			compatible_flags: FlagSet::<CompatibleFlag>::default(),
			incompatible_flags: incompatible,
			state: self.state,
			file_id: FILE_ID,
			machine_id: MACHINE_ID,
			tail_entry_boot_id: NonZeroU128::new(BOOT_ID),
			seqnum_id: NonZeroU128::new(0xe07c05ef9aa942905a5a70224b227a25).unwrap(),
			header_size: NonZeroU64::new(MAX_HEADER_SIZE as u64).unwrap(),
			arena_size: NonZeroU64::new(file_len + self.tail_padding - MAX_HEADER_SIZE as u64)
				.unwrap(),
			data_hash_table_offset: NonZeroU64::new(data_table_offset + OBJECT_HEADER_SIZE)
				.unwrap(),
			data_hash_table_size: NonZeroU64::new(table_size).unwrap(),
			field_hash_table_offset: NonZeroU64::new(field_table_offset + OBJECT_HEADER_SIZE)
				.unwrap(),
			field_hash_table_size: NonZeroU64::new(table_size).unwrap(),
			tail_object_offset: NonZeroU64::new(tail_object_offset).unwrap(),
			n_objects: NonZeroU64::new(n_objects).unwrap(),
			n_entries: 1,
			tail_entry_seqnum: NonZeroU64::new(1),
			head_entry_seqnum: NonZeroU64::new(1),
			entry_array_offset: NonZeroU64::new(entry_array_offsets[0]).unwrap(),
			head_entry_realtime: Some(realtime),
			tail_entry_realtime: Some(realtime),
			tail_entry_monotonic: NonZeroU64::new(370_782_072_822),
			n_data: Some(self.datas.len() as u64),
			n_fields: Some(field_names.len() as u64),
			n_tags: Some(0),
			n_entry_arrays: Some(n_entry_arrays as u64),
			data_hash_chain_depth: Some(data_depth),
			field_hash_chain_depth: Some(field_depth),
			tail_entry_array_offset: NonZeroU32::new(entry_array_offsets[0] as u32),
			tail_entry_array_n_entries: NonZeroU32::new(1),
			tail_entry_offset: NonZeroU64::new(entry_offset),
		};

		// Serialize.
		let mut bytes = header.to_bytes().unwrap();
		assert_eq!(bytes.len(), MAX_HEADER_SIZE);
		bytes.resize((file_len + self.tail_padding) as usize, 0);
		for object in &planned {
			let object_header = ObjectHeader {
				r#type: object.r#type,
				compression: object.compression,
				size: object.size,
			};
			let at = object.offset as usize;
			let head = object_header.to_bytes().unwrap();
			bytes[at..at + head.len()].copy_from_slice(&head);
			bytes[at + head.len()..at + head.len() + object.body.len()]
				.copy_from_slice(&object.body);
		}
		// Corruption markers are all-zero object headers, already in place
		// thanks to the zero fill.

		Fixture {
			bytes,
			object_offsets: planned
				.iter()
				.map(|o| (o.offset, o.r#type, o.size))
				.collect(),
			field_offsets: field_offsets.to_vec(),
			data_offsets: data_offsets.to_vec(),
			entry_offset,
			entry_array_offsets: entry_array_offsets.to_vec(),
			tail_object_offset,
			n_objects,
		}
	}
}

impl Default for JournalBuilder {
	fn default() -> Self {
		Self::new()
	}
}
