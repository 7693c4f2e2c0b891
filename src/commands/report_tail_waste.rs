use std::io;

use crate::{
	header::State,
	humane::humane_bytes,
	objects::align64,
	reader::AsyncFileRead,
	set::JournalSet,
};

const STATES: [State; 3] = [State::Offline, State::Online, State::Archived];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TailWasteReport {
	pub per_state_counts: [u64; 3],
	pub per_state_bytes: [u64; 3],
	pub total: u64,
	pub total_file_size: u64,
	pub n_journals: u64,
}

fn percent(part: u64, whole: u64) -> f64 {
	if whole == 0 {
		0.0
	} else {
		100.0 * part as f64 / whole as f64
	}
}

/// Print per-journal tail waste and collect the totals.
pub async fn run<T>(set: &mut JournalSet<T>) -> io::Result<TailWasteReport>
where
	T: AsyncFileRead,
{
	let mut stats = TailWasteReport::default();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;
		let tail_object = journal.get_object_header(header.tail_object_offset.get()).await?;
		let size = journal.file_size().await?;
		let tail = header.tail_object_offset.get() + align64(tail_object.size);
		let waste = size.saturating_sub(tail);

		println!(
			"\t{}: {}, size: {}, tail-waste: {}",
			header.state.as_str(),
			journal.name(),
			humane_bytes(size),
			humane_bytes(waste),
		);

		let state = header.state as usize;
		stats.per_state_bytes[state] += waste;
		stats.per_state_counts[state] += 1;
		stats.total += waste;
		stats.total_file_size += size;
		stats.n_journals += 1;
	}

	Ok(stats)
}

pub fn print_totals(stats: &TailWasteReport) {
	println!("\nTotals:");
	println!("\tTail-waste by state:");
	for state in STATES {
		let i = state as usize;
		println!(
			"\t\t{:>10} [{}]: {}, {:.1}% of all tail-waste",
			state.as_str(),
			stats.per_state_counts[i],
			humane_bytes(stats.per_state_bytes[i]),
			percent(stats.per_state_bytes[i], stats.total),
		);
	}

	println!(
		"\n\tAggregate tail-waste: {}, {:.1}% of {} spanning {} journal files",
		humane_bytes(stats.total),
		percent(stats.total, stats.total_file_size),
		humane_bytes(stats.total_file_size),
		stats.n_journals,
	);
}

#[cfg(test)]
mod tests {
	use crate::{reader::Journal, testutil::JournalBuilder};

	use super::*;

	#[tokio::test]
	async fn waste_is_attributed_per_state() {
		let archived = JournalBuilder::new()
			.state(State::Archived)
			.tail_padding(512)
			.build();
		let offline = JournalBuilder::new()
			.state(State::Offline)
			.tail_padding(512)
			.build();
		let online = JournalBuilder::new().state(State::Online).build();

		let total_file_size =
			(archived.bytes.len() + offline.bytes.len() + online.bytes.len()) as u64;

		let mut set = JournalSet::from_journals(vec![
			Journal::new("system@old.journal", archived.cursor()),
			Journal::new("system@older.journal", offline.cursor()),
			Journal::new("system.journal", online.cursor()),
		]);
		let stats = run(&mut set).await.unwrap();

		assert_eq!(stats.n_journals, 3);
		assert_eq!(stats.total, 1024);
		assert_eq!(stats.total_file_size, total_file_size);
		assert_eq!(stats.per_state_bytes[State::Archived as usize], 512);
		assert_eq!(stats.per_state_bytes[State::Offline as usize], 512);
		assert_eq!(stats.per_state_bytes[State::Online as usize], 0);
		assert_eq!(stats.per_state_counts, [1, 1, 1]);
	}

	#[test]
	fn small_totals_keep_percentage_precision() {
		// 50 of 75 bytes is 66.7%, not the 0% integer division would give.
		assert!((percent(50, 75) - 66.666).abs() < 0.01);
		assert_eq!(percent(0, 0), 0.0);
	}
}
