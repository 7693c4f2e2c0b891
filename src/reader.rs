pub use file_read::AsyncFileRead;

mod file_read;

use std::io;
use std::num::NonZeroU64;

use async_stream::try_stream;
use deku::DekuContainerRead as _;
use futures_util::Stream;
use tracing::warn;

use crate::{
	cache::{ReadCache, PAGE_SIZE},
	header::{Header, MAX_HEADER_SIZE},
	objects::{
		align64, invalid_data, DataObjectHeader, FieldObjectHeader, Object, ObjectHeader,
		ObjectType, DATA_OBJECT_HEADER_SIZE, FIELD_OBJECT_HEADER_SIZE, OBJECT_HEADER_SIZE,
	},
	tables::{parse_hash_table, HashItem, HashTableRef},
};

/// One journal file: its name, an open handle (unless the open was skipped
/// for lack of permission), and a private read cache.
pub struct Journal<T> {
	name: String,
	io: Option<T>,
	cache: ReadCache,
}

impl<T> std::fmt::Debug for Journal<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Journal")
			.field("name", &self.name)
			.field("io", &std::any::type_name::<T>())
			.field("skipped", &self.io.is_none())
			.finish()
	}
}

impl<T> Journal<T> {
	pub fn new(name: impl ToString, io: T) -> Self {
		Self {
			name: name.to_string(),
			io: Some(io),
			cache: ReadCache::new(),
		}
	}

	/// A journal that could not be opened and will be passed over.
	pub fn skipped(name: impl ToString) -> Self {
		Self {
			name: name.to_string(),
			io: None,
			cache: ReadCache::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_skipped(&self) -> bool {
		self.io.is_none()
	}
}

impl<T> Journal<T>
where
	T: AsyncFileRead,
{
	fn parts(&mut self) -> io::Result<(&mut T, &mut ReadCache)> {
		match self.io.as_mut() {
			Some(io) => Ok((io, &mut self.cache)),
			None => Err(io::Error::new(
				io::ErrorKind::NotConnected,
				format!("journal \"{}\" was skipped at open time", self.name),
			)),
		}
	}

	/// Fill `buf` from `offset`, through the cache for sub-page reads.
	///
	/// EOF inside the requested range is an invalid-format error.
	pub async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()> {
		let (io, cache) = self.parts()?;

		if buf.len() <= PAGE_SIZE {
			return cache.read(io, buf, offset).await;
		}

		let n = io.read_at(buf, offset).await?;
		if n < buf.len() {
			return Err(invalid_data(format!(
				"read of {} bytes at {offset} returned only {n}",
				buf.len()
			)));
		}
		Ok(())
	}

	pub async fn file_size(&mut self) -> io::Result<u64> {
		self.parts()?.0.file_size().await
	}

	/// Truncate the underlying file. Must not race in-flight reads; callers
	/// finish all reads against this journal first.
	pub async fn truncate(&mut self, len: u64) -> io::Result<()> {
		self.parts()?.0.truncate(len).await
	}

	/// Load and decode the file header.
	pub async fn get_header(&mut self) -> io::Result<Header> {
		let mut buf = [0u8; MAX_HEADER_SIZE];
		self.read_at(&mut buf, 0).await?;
		Header::parse(&buf)
	}

	/// Load the 16-byte object header at `offset`.
	pub async fn get_object_header(&mut self, offset: u64) -> io::Result<ObjectHeader> {
		let mut buf = [0u8; OBJECT_HEADER_SIZE as usize];
		self.read_at(&mut buf, offset).await?;
		ObjectHeader::parse(&buf)
	}

	/// Load and decode the whole object of `size` bytes at `offset`.
	pub async fn get_object(&mut self, offset: u64, size: u64, compact: bool) -> io::Result<Object> {
		if size < OBJECT_HEADER_SIZE {
			return Err(invalid_data(format!(
				"object at {offset} declares {size} bytes, less than an object header"
			)));
		}

		let mut buf = vec![0u8; size as usize];
		self.read_at(&mut buf, offset).await?;
		Object::parse(&buf, compact)
	}

	/// Load the object at `offset` in two phases: header first, then a
	/// buffer of exactly the declared size.
	pub async fn get_object_full(&mut self, offset: u64, compact: bool) -> io::Result<Object> {
		let header = self.get_object_header(offset).await?;
		self.get_object(offset, header.size, compact).await
	}

	/// Load a whole hash table payload into memory.
	pub async fn get_hash_table(&mut self, table: HashTableRef) -> io::Result<Vec<HashItem>> {
		let mut buf = vec![0u8; table.size as usize];
		self.read_at(&mut buf, table.offset).await?;
		parse_hash_table(&buf)
	}

	/// Stream every object header in the file, in offset order.
	///
	/// A zero-sized object marks the remainder of the file corrupt: objects
	/// before it are yielded, a warning names the file once, and the stream
	/// ends without error.
	pub fn iter_objects<'j>(
		&'j mut self,
		header: &'j Header,
	) -> impl Stream<Item = io::Result<(u64, ObjectHeader)>> + Unpin + 'j {
		Box::pin(try_stream! {
			let tail = header.tail_object_offset.get();
			let mut offset = header.header_size.get();

			while offset <= tail {
				let object = match self.get_object_header(offset).await {
					Ok(object) => object,
					// Garbage bytes corrupt the remainder of the file but
					// not the run; the stream just ends.
					Err(err) if err.kind() == io::ErrorKind::InvalidData => {
						warn!(
							"Object at {offset} unreadable, journal \"{}\" appears corrupt, ignoring remainder: {err}",
							self.name,
						);
						break;
					}
					Err(err) => Err(err)?,
				};
				if object.size == 0 {
					warn!(
						"Encountered zero-sized object, journal \"{}\" appears corrupt, ignoring remainder",
						self.name,
					);
					break;
				}

				let next = offset + align64(object.size);
				yield (offset, object);
				offset = next;
			}
		})
	}

	/// Stream the hashed objects of one hash table, bucket by bucket.
	///
	/// `kind` picks which flavour of hashed object the chains hold; each
	/// step loads the object's fixed headers only, never its payload.
	pub fn hash_chain<'j>(
		&'j mut self,
		table: &'j [HashItem],
		kind: ChainKind,
	) -> impl Stream<Item = io::Result<ChainVisit>> + Unpin + 'j {
		Box::pin(try_stream! {
			let n_buckets = table.len();
			let mut bucket = 0usize;
			let mut offset;

			// Find the first non-empty bucket.
			loop {
				if bucket >= n_buckets {
					return;
				}
				if let Some(head) = table[bucket].head_hash_offset {
					offset = head.get();
					break;
				}
				bucket += 1;
			}

			loop {
				let object = match self.chain_object(offset, kind).await {
					Ok(object) => object,
					Err(err) if err.kind() == io::ErrorKind::InvalidData => {
						warn!(
							"Chain object at {offset} unreadable, journal \"{}\" appears corrupt, ignoring remainder: {err}",
							self.name,
						);
						return;
					}
					Err(err) => Err(err)?,
				};
				let next_hash_offset = object.next_hash_offset();
				let at_tail =
					table[bucket].tail_hash_offset == NonZeroU64::new(offset);

				yield ChainVisit { bucket: bucket as u64, offset, object };

				if at_tail {
					// On to the next non-empty bucket.
					loop {
						bucket += 1;
						if bucket >= n_buckets {
							return;
						}
						if let Some(head) = table[bucket].head_hash_offset {
							offset = head.get();
							break;
						}
					}
				} else if next_hash_offset == 0 {
					warn!(
						"Bucket chain ends before its recorded tail, journal \"{}\" appears corrupt, ignoring remainder",
						self.name,
					);
					return;
				} else {
					offset = next_hash_offset;
				}
			}
		})
	}

	async fn chain_object(&mut self, offset: u64, kind: ChainKind) -> io::Result<ChainObject> {
		let mut buf = vec![0u8; kind.read_size() as usize];
		self.read_at(&mut buf, offset).await?;

		let object = ObjectHeader::parse(&buf)?;
		let body = &buf[OBJECT_HEADER_SIZE as usize..];
		match (kind, object.r#type) {
			(ChainKind::Data, ObjectType::Data) => {
				let (_, header) = DataObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;
				Ok(ChainObject::Data { object, header })
			}
			(ChainKind::Field, ObjectType::Field) => {
				let (_, header) = FieldObjectHeader::from_bytes((body, 0)).map_err(invalid_data)?;
				Ok(ChainObject::Field { object, header })
			}
			(_, other) => Err(invalid_data(format!(
				"expected a {} object in the hash chain at {offset}, found {}",
				kind.as_str(),
				other.as_str()
			))),
		}
	}
}

/// Which hash table a chain walk traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
	Data,
	Field,
}

impl ChainKind {
	/// Bytes loaded per chain step: the object header plus the fixed
	/// hashed-object fields of this kind.
	pub const fn read_size(self) -> u64 {
		OBJECT_HEADER_SIZE
			+ match self {
				ChainKind::Data => DATA_OBJECT_HEADER_SIZE,
				ChainKind::Field => FIELD_OBJECT_HEADER_SIZE,
			}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			ChainKind::Data => "Data",
			ChainKind::Field => "Field",
		}
	}
}

/// The fixed headers of a hashed object met during a chain walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainObject {
	Data {
		object: ObjectHeader,
		header: DataObjectHeader,
	},
	Field {
		object: ObjectHeader,
		header: FieldObjectHeader,
	},
}

impl ChainObject {
	pub const fn hash(&self) -> u64 {
		match self {
			ChainObject::Data { header, .. } => header.hash,
			ChainObject::Field { header, .. } => header.hash,
		}
	}

	pub const fn next_hash_offset(&self) -> u64 {
		match self {
			ChainObject::Data { header, .. } => header.next_hash_offset,
			ChainObject::Field { header, .. } => header.next_hash_offset,
		}
	}

	pub fn object_header(&self) -> &ObjectHeader {
		match self {
			ChainObject::Data { object, .. } => object,
			ChainObject::Field { object, .. } => object,
		}
	}
}

/// One step of a hash chain walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVisit {
	pub bucket: u64,
	pub offset: u64,
	pub object: ChainObject,
}

#[cfg(test)]
mod tests {
	use futures_util::StreamExt as _;

	use crate::testutil::JournalBuilder;

	use super::*;

	async fn collect_objects<T: AsyncFileRead>(
		journal: &mut Journal<T>,
		header: &Header,
	) -> Vec<(u64, ObjectHeader)> {
		let mut seen = Vec::new();
		let mut objects = journal.iter_objects(header);
		while let Some(next) = objects.next().await {
			seen.push(next.unwrap());
		}
		seen
	}

	#[tokio::test]
	async fn iteration_covers_every_object_in_offset_order() {
		let fixture = JournalBuilder::new().build();
		let mut journal = Journal::new("system.journal", fixture.cursor());
		let header = journal.get_header().await.unwrap();

		let seen = collect_objects(&mut journal, &header).await;

		assert_eq!(seen.len() as u64, header.n_objects.get());
		assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
		assert_eq!(seen.last().unwrap().0, header.tail_object_offset.get());

		let expected: Vec<u64> = fixture.object_offsets.iter().map(|&(o, _, _)| o).collect();
		let offsets: Vec<u64> = seen.iter().map(|&(o, _)| o).collect();
		assert_eq!(offsets, expected);
	}

	#[tokio::test]
	async fn zero_sized_object_ends_iteration_early() {
		let fixture = JournalBuilder::new().corrupt_after(3).build();
		let mut journal = Journal::new("corrupt.journal", fixture.cursor());
		let header = journal.get_header().await.unwrap();

		let seen = collect_objects(&mut journal, &header).await;

		// Everything before the corruption, nothing after, no error.
		assert_eq!(seen.len(), 3);
		let expected: Vec<u64> = fixture.object_offsets[..3]
			.iter()
			.map(|&(o, _, _)| o)
			.collect();
		assert_eq!(seen.iter().map(|&(o, _)| o).collect::<Vec<_>>(), expected);
	}

	#[tokio::test]
	async fn chain_walks_visit_every_hashed_object_in_its_bucket() {
		let fixture = JournalBuilder::new().build();
		let mut journal = Journal::new("system.journal", fixture.cursor());
		let header = journal.get_header().await.unwrap();

		for (kind, table_ref, expected_count, expected_offsets) in [
			(
				ChainKind::Data,
				header.data_hash_table(),
				header.n_data.unwrap(),
				&fixture.data_offsets,
			),
			(
				ChainKind::Field,
				header.field_hash_table(),
				header.n_fields.unwrap(),
				&fixture.field_offsets,
			),
		] {
			let table = journal.get_hash_table(table_ref).await.unwrap();
			let n_buckets = table.len() as u64;

			let mut visits = Vec::new();
			{
				let mut chain = journal.hash_chain(&table, kind);
				while let Some(next) = chain.next().await {
					visits.push(next.unwrap());
				}
			}

			assert_eq!(visits.len() as u64, expected_count);

			// Every hashed object is visited exactly once.
			let mut offsets: Vec<u64> = visits.iter().map(|v| v.offset).collect();
			offsets.sort_unstable();
			let mut expected = expected_offsets.clone();
			expected.sort_unstable();
			assert_eq!(offsets, expected);

			// And in the bucket its hash maps to.
			for visit in &visits {
				assert_eq!(visit.bucket, visit.object.hash() % n_buckets);
			}
		}
	}

	#[tokio::test]
	async fn object_loading_round_trips() {
		let fixture = JournalBuilder::new().build();
		let mut journal = Journal::new("system.journal", fixture.cursor());
		let header = journal.get_header().await.unwrap();
		let compact = header.is_compact();

		for &(offset, _, _) in &fixture.object_offsets {
			let object_header = journal.get_object_header(offset).await.unwrap();
			let direct = journal
				.get_object(offset, object_header.size, compact)
				.await
				.unwrap();
			let full = journal.get_object_full(offset, compact).await.unwrap();
			assert_eq!(direct, full);
			assert_eq!(*full.object_header(), object_header);
		}
	}

	#[tokio::test]
	async fn entry_and_arrays_reference_each_other() {
		let fixture = JournalBuilder::new().build();
		let mut journal = Journal::new("system.journal", fixture.cursor());
		let header = journal.get_header().await.unwrap();

		let Object::Entry(entry) = journal
			.get_object_full(fixture.entry_offset, header.is_compact())
			.await
			.unwrap()
		else {
			panic!("expected an Entry at the fixture's entry offset");
		};
		assert_eq!(
			entry.items.iter().map(|i| i.object_offset).collect::<Vec<_>>(),
			fixture.data_offsets,
		);

		let Object::EntryArray(array) = journal
			.get_object_full(header.entry_array_offset.get(), header.is_compact())
			.await
			.unwrap()
		else {
			panic!("expected an EntryArray at the header's entry array offset");
		};
		assert_eq!(array.items, vec![fixture.entry_offset]);
	}

	#[tokio::test]
	async fn reads_against_a_skipped_journal_fail() {
		let mut journal: Journal<futures_util::io::Cursor<Vec<u8>>> =
			Journal::skipped("secret.journal");
		assert!(journal.is_skipped());
		let err = journal.get_header().await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::NotConnected);
	}
}
