use std::io;

use futures_util::StreamExt as _;

use crate::{
	humane::humane_bytes,
	objects::ObjectType,
	reader::AsyncFileRead,
	set::JournalSet,
};

const TYPE_ROWS: [ObjectType; 8] = [
	ObjectType::Unused,
	ObjectType::Data,
	ObjectType::Field,
	ObjectType::Entry,
	ObjectType::DataHashTable,
	ObjectType::FieldHashTable,
	ObjectType::EntryArray,
	ObjectType::Tag,
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Usage {
	pub count_per_type: [u64; 8],
	pub use_per_type: [u64; 8],
	pub unknown_count: u64,
	pub unknown_use: u64,
	pub use_total: u64,
	pub file_size: u64,
	pub n_journals: u64,
}

impl Usage {
	fn record(&mut self, r#type: ObjectType, size: u64) {
		match TYPE_ROWS.iter().position(|&t| t == r#type) {
			Some(i) => {
				self.count_per_type[i] += 1;
				self.use_per_type[i] += size;
			}
			None => {
				self.unknown_count += 1;
				self.unknown_use += size;
			}
		}
		self.use_total += size;
	}
}

/// Tally object counts and bytes per type across the whole set.
pub async fn run<T>(set: &mut JournalSet<T>) -> io::Result<Usage>
where
	T: AsyncFileRead,
{
	let mut usage = Usage::default();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;
		usage.file_size += journal.file_size().await?;
		usage.n_journals += 1;

		let mut objects = journal.iter_objects(&header);
		while let Some(next) = objects.next().await {
			let (_, object) = next?;
			usage.record(object.r#type, object.size);
		}
	}

	Ok(usage)
}

pub fn print_usage(usage: &Usage) {
	println!("Per-object-type usage:");
	for (i, r#type) in TYPE_ROWS.iter().enumerate() {
		println!(
			"{:>16}: [{}] {}",
			r#type.as_str(),
			usage.count_per_type[i],
			humane_bytes(usage.use_per_type[i]),
		);
	}
	if usage.unknown_count > 0 {
		println!(
			"{:>16}: [{}] {}",
			"UNKNOWN",
			usage.unknown_count,
			humane_bytes(usage.unknown_use),
		);
	}

	println!(
		"Aggregate object usage: {} of {} spanning {} journal files",
		humane_bytes(usage.use_total),
		humane_bytes(usage.file_size),
		usage.n_journals,
	);
}

#[cfg(test)]
mod tests {
	use crate::{reader::Journal, testutil::JournalBuilder};

	use super::*;

	#[tokio::test]
	async fn counts_and_bytes_match_the_file() {
		let fixture = JournalBuilder::new().build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let usage = run(&mut set).await.unwrap();

		assert_eq!(usage.n_journals, 1);
		assert_eq!(usage.file_size, fixture.bytes.len() as u64);

		let mut expected = Usage::default();
		for &(_, r#type, size) in &fixture.object_offsets {
			expected.record(r#type, size);
		}
		assert_eq!(usage.count_per_type, expected.count_per_type);
		assert_eq!(usage.use_per_type, expected.use_per_type);
		assert_eq!(usage.use_total, expected.use_total);
		assert_eq!(usage.unknown_count, 0);

		let data_row = TYPE_ROWS
			.iter()
			.position(|&t| t == ObjectType::Data)
			.unwrap();
		assert_eq!(usage.count_per_type[data_row], 3);
	}

	#[tokio::test]
	async fn usage_spans_multiple_journals() {
		let one = JournalBuilder::new().build();
		let two = JournalBuilder::new().build();
		let mut set = JournalSet::from_journals(vec![
			Journal::new("a.journal", one.cursor()),
			Journal::new("b.journal", two.cursor()),
		]);
		let usage = run(&mut set).await.unwrap();

		assert_eq!(usage.n_journals, 2);
		assert_eq!(
			usage.file_size,
			(one.bytes.len() + two.bytes.len()) as u64,
		);
		assert_eq!(
			usage.count_per_type.iter().sum::<u64>(),
			one.n_objects + two.n_objects,
		);
	}
}
