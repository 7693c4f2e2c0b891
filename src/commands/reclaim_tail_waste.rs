use std::io;

use crate::{
	header::State,
	humane::humane_bytes,
	objects::align64,
	reader::AsyncFileRead,
	set::JournalSet,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TailWasteReclaim {
	pub n_journals: u64,
	pub n_reclaimed: u64,
	pub n_ignored: u64,
	pub n_errored: u64,
	/// Journals with no tail waste at all.
	pub n_clean: u64,
	pub reclaimed_bytes: u64,
	pub ignored_bytes: u64,
	pub errored_bytes: u64,
}

/// Truncate every archived journal to the end of its tail object.
///
/// Unarchived journals with tail waste are reported and left alone. All
/// reads against a journal complete before its truncate is issued.
pub async fn run<T>(set: &mut JournalSet<T>) -> io::Result<TailWasteReclaim>
where
	T: AsyncFileRead,
{
	let mut stats = TailWasteReclaim::default();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;
		let tail_object = journal.get_object_header(header.tail_object_offset.get()).await?;
		let size = journal.file_size().await?;
		let tail = header.tail_object_offset.get() + align64(tail_object.size);

		stats.n_journals += 1;

		if size <= tail {
			stats.n_clean += 1;
			continue;
		}
		let waste = size - tail;

		if header.state != State::Archived {
			println!(
				"Ignoring {} of tail-waste on \"{}\" for not being archived (state={})",
				humane_bytes(waste),
				journal.name(),
				header.state.as_str(),
			);
			stats.n_ignored += 1;
			stats.ignored_bytes += waste;
			continue;
		}

		match journal.truncate(tail).await {
			Ok(()) => {
				stats.n_reclaimed += 1;
				stats.reclaimed_bytes += waste;
			}
			Err(err) => {
				eprintln!(
					"Unable to truncate \"{}\" to {tail}, ignoring: {err}",
					journal.name(),
				);
				stats.n_errored += 1;
				stats.errored_bytes += waste;
			}
		}
	}

	Ok(stats)
}

pub fn print_summary(stats: &TailWasteReclaim) {
	println!("\nSummary:");
	if stats.n_journals == 0 {
		println!("\tNo journal files opened!");
	}

	if stats.n_clean > 0 {
		println!("\tSkipped {} journal files free of tail-waste", stats.n_clean);
	}

	if stats.n_ignored > 0 {
		println!(
			"\tIgnored {} unarchived journal files totalling {} of tail-waste",
			stats.n_ignored,
			humane_bytes(stats.ignored_bytes),
		);
	}

	if stats.n_reclaimed > 0 {
		println!(
			"\tReclaimed {} from {} journal files",
			humane_bytes(stats.reclaimed_bytes),
			stats.n_reclaimed,
		);
	}

	if stats.n_errored > 0 {
		println!(
			"\tFailed to reclaim {} from {} journal files due to errors",
			humane_bytes(stats.errored_bytes),
			stats.n_errored,
		);
	}
}
