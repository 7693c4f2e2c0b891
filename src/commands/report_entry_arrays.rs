use std::collections::HashMap;
use std::io;

use futures_util::StreamExt as _;

use crate::{
	humane::humane_bytes,
	objects::{Object, ObjectType, ENTRY_ARRAY_HEADER_SIZE, OBJECT_HEADER_SIZE},
	reader::AsyncFileRead,
	set::JournalSet,
};

/// Per-log2(size) tally of entry arrays.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountBucket {
	pub total: u64,
	pub unique: u64,
}

/// Per-log2(size) tally of entry array bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BytesBucket {
	pub total: u64,
	pub unique: u64,
}

/// Per-log2(size) tally of entry array slot utilization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UtilBucket {
	pub total: u64,
	pub utilized: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryArraySummary {
	pub count: u64,
	pub unique: u64,
	pub count_buckets: [CountBucket; 64],
	pub bytes_buckets: [BytesBucket; 64],
	pub util_buckets: [UtilBucket; 64],
}

#[derive(Default)]
struct SeenArray {
	count: u64,
	size: u64,
	utilized: u64,
}

/// Characterize entry-array duplication and utilization per journal.
///
/// Identical payloads are detected by content digest; utilization counts
/// filled slots against allocated slots.
pub async fn run<T>(set: &mut JournalSet<T>) -> io::Result<Vec<(String, EntryArraySummary)>>
where
	T: AsyncFileRead,
{
	let mut reports = Vec::new();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;
		let compact = header.is_compact();
		let item_size = header.sizeof_entry_array_item();

		let mut array_offsets = Vec::new();
		{
			let mut objects = journal.iter_objects(&header);
			while let Some(next) = objects.next().await {
				let (offset, object) = next?;
				if object.r#type == ObjectType::EntryArray {
					array_offsets.push((offset, object.size));
				}
			}
		}

		let mut count = 0u64;
		let mut seen: HashMap<[u8; 32], SeenArray> = HashMap::new();
		for (offset, size) in array_offsets {
			let Object::EntryArray(array) = journal.get_object(offset, size, compact).await?
			else {
				continue;
			};
			count += 1;

			let mut digest = blake3::Hasher::new();
			for item in &array.items {
				digest.update(&item.to_le_bytes());
			}
			let entry = seen.entry(*digest.finalize().as_bytes()).or_default();
			if entry.count == 0 {
				entry.size = size - OBJECT_HEADER_SIZE - ENTRY_ARRAY_HEADER_SIZE;
				entry.utilized = array.utilized() * item_size;
			}
			entry.count += 1;
		}

		let summary = summarize(count, &seen);
		reports.push((journal.name().to_string(), summary));
	}

	Ok(reports)
}

fn summarize(count: u64, seen: &HashMap<[u8; 32], SeenArray>) -> EntryArraySummary {
	let mut summary = EntryArraySummary {
		count,
		unique: seen.len() as u64,
		count_buckets: [CountBucket::default(); 64],
		bytes_buckets: [BytesBucket::default(); 64],
		util_buckets: [UtilBucket::default(); 64],
	};

	for array in seen.values() {
		let l2 = if array.size == 0 { 0 } else { array.size.ilog2() as usize };

		summary.count_buckets[l2].unique += 1;
		summary.count_buckets[l2].total += array.count;

		summary.bytes_buckets[l2].unique += array.size;
		summary.bytes_buckets[l2].total += array.size * array.count;

		summary.util_buckets[l2].total += array.size * array.count;
		summary.util_buckets[l2].utilized += array.utilized * array.count;
	}

	summary
}

fn bucket_percent(part: u64, whole: u64) -> f64 {
	if whole == 0 {
		0.0
	} else {
		100.0 * part as f64 / whole as f64
	}
}

pub fn print_summary(name: &str, summary: &EntryArraySummary) {
	println!("\n\nEntry-array stats for \"{name}\":");
	println!("  Total EAs: {}", summary.count);
	println!(
		"  Unique EAs: {} (%{:.1})",
		summary.unique,
		bucket_percent(summary.unique, summary.count),
	);

	print!("  log2(size) counts (%unique[total,unique] ...): ");
	for bucket in &summary.count_buckets {
		if bucket.total == 0 {
			print!("[] ");
		} else {
			print!(
				"{:.1}%[{},{}] ",
				bucket_percent(bucket.unique, bucket.total),
				bucket.total,
				bucket.unique,
			);
		}
	}
	println!();

	print!("  log2(size) sizes (%unique[total,unique] ...): ");
	for bucket in &summary.bytes_buckets {
		if bucket.total == 0 {
			print!("[] ");
		} else {
			print!(
				"{:.1}%[{},{}] ",
				bucket_percent(bucket.unique, bucket.total),
				humane_bytes(bucket.total),
				humane_bytes(bucket.unique),
			);
		}
	}
	println!();

	print!("  log2(size) utilization (%used[total,used] ...): ");
	for bucket in &summary.util_buckets {
		if bucket.total == 0 {
			print!("[] ");
		} else {
			print!(
				"{:.1}%[{},{}] ",
				bucket_percent(bucket.utilized, bucket.total),
				humane_bytes(bucket.total),
				humane_bytes(bucket.utilized),
			);
		}
	}
	println!();
}

#[cfg(test)]
mod tests {
	use crate::{reader::Journal, testutil::JournalBuilder};

	use super::*;

	#[tokio::test]
	async fn duplicate_arrays_are_detected_by_content() {
		let fixture = JournalBuilder::new().duplicate_entry_array().build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let reports = run(&mut set).await.unwrap();

		assert_eq!(reports.len(), 1);
		let (name, summary) = &reports[0];
		assert_eq!(name, "system.journal");
		assert_eq!(summary.count, 2);
		assert_eq!(summary.unique, 1);

		let l2 = 8u64.ilog2() as usize; // one slot of eight bytes
		assert_eq!(summary.count_buckets[l2], CountBucket { total: 2, unique: 1 });
	}

	#[tokio::test]
	async fn utilization_counts_filled_slots() {
		let fixture = JournalBuilder::new().extra_array_slots(3).build();
		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let reports = run(&mut set).await.unwrap();

		let (_, summary) = &reports[0];
		assert_eq!(summary.count, 1);
		assert_eq!(summary.unique, 1);

		// One filled slot of four: 8 of 32 bytes utilized.
		let l2 = 32u64.ilog2() as usize;
		assert_eq!(summary.util_buckets[l2], UtilBucket { total: 32, utilized: 8 });
	}
}
