use std::io;

use bstr::BString;
use futures_util::StreamExt as _;
use tracing::warn;

use crate::{
	compress::decompress,
	hashes::payload_hash,
	objects::{invalid_data, DataCompression, Object, ObjectType},
	reader::AsyncFileRead,
	set::JournalSet,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyStats {
	pub n_verified: u64,
	/// Hashed objects with payloads this engine cannot decompress.
	pub n_skipped: u64,
}

/// Check every Data and Field object's stored hash against its payload.
///
/// Compressed payloads are decompressed first; the hash always covers the
/// plain bytes. The first mismatch fails the run.
pub async fn run<T>(set: &mut JournalSet<T>) -> io::Result<VerifyStats>
where
	T: AsyncFileRead,
{
	let mut stats = VerifyStats::default();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;
		let compact = header.is_compact();

		let mut hashed_offsets = Vec::new();
		{
			let mut objects = journal.iter_objects(&header);
			while let Some(next) = objects.next().await {
				let (offset, object) = next?;
				if matches!(object.r#type, ObjectType::Data | ObjectType::Field) {
					hashed_offsets.push((offset, object.size));
				}
			}
		}

		for (offset, size) in hashed_offsets {
			let object = journal.get_object(offset, size, compact).await?;
			let (stored, payload, compression) = match &object {
				Object::Data(data) => (data.header.hash, &data.payload, data.object.compression),
				Object::Field(field) => {
					(field.header.hash, &field.payload, field.object.compression)
				}
				_ => {
					return Err(invalid_data(format!(
						"object at {offset} changed type mid-verification"
					)))
				}
			};

			let plain: BString = match compression {
				DataCompression::None => payload.clone(),
				DataCompression::Zstd => decompress(compression, payload)?.into(),
				DataCompression::Xz | DataCompression::Lz4 => {
					warn!(
						"Skipping {}-compressed object at {offset} in \"{}\", cannot decompress",
						compression.as_str(),
						journal.name(),
					);
					stats.n_skipped += 1;
					continue;
				}
			};

			let computed = payload_hash(&header, &plain);
			if computed != stored {
				println!("mismatch {computed:x} != {stored:x}\ncontents=\"{plain}\"");
				return Err(invalid_data(format!(
					"hash mismatch at {offset} in \"{}\"",
					journal.name()
				)));
			}
			stats.n_verified += 1;
		}
	}

	Ok(stats)
}

#[cfg(test)]
mod tests {
	use crate::{
		objects::{DataCompression, DATA_OBJECT_HEADER_SIZE, OBJECT_HEADER_SIZE},
		reader::Journal,
		testutil::JournalBuilder,
	};

	use super::*;

	#[tokio::test]
	async fn keyed_hashes_verify() {
		let fixture = JournalBuilder::new().keyed(true).build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let stats = run(&mut set).await.unwrap();

		// Three datas and their two field names.
		assert_eq!(stats.n_verified, 5);
		assert_eq!(stats.n_skipped, 0);
	}

	#[tokio::test]
	async fn unkeyed_hashes_verify_with_lookup3() {
		let fixture = JournalBuilder::new().keyed(false).build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let stats = run(&mut set).await.unwrap();
		assert_eq!(stats.n_verified, 5);
	}

	#[tokio::test]
	async fn zstd_payloads_are_decompressed_before_hashing() {
		let fixture = JournalBuilder::new()
			.datas(vec![
				(
					b"MESSAGE=a long message that compresses well well well well well"
						.repeat(4),
					DataCompression::Zstd,
				),
				(b"PRIORITY=6".to_vec(), DataCompression::None),
			])
			.build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let stats = run(&mut set).await.unwrap();
		assert_eq!(stats.n_verified, 4);
	}

	#[tokio::test]
	async fn tampered_payload_is_detected() {
		let fixture = JournalBuilder::new().build();
		let mut bytes = fixture.bytes.clone();
		let payload_at =
			(fixture.data_offsets[0] + OBJECT_HEADER_SIZE + DATA_OBJECT_HEADER_SIZE) as usize;
		bytes[payload_at] ^= 0xff;

		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			futures_util::io::Cursor::new(bytes),
		)]);
		let err = run(&mut set).await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);
	}
}
