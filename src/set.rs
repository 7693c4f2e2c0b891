use std::io;
use std::path::Path;

use futures_util::future::join_all;
use tokio::fs::OpenOptions;
use tracing::warn;

use crate::{
	impls::JournalFile,
	reader::{AsyncFileRead, Journal},
};

/// Where persistent journals live; one subdirectory per machine id.
pub const PERSISTENT_PATH: &str = "/var/log/journal";

/// How journal files are opened for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
	ReadOnly,
	/// Needed by commands that truncate.
	ReadWrite,
}

/// All journals of one host, in directory enumeration order.
///
/// Fixed after the open phase; journals that could not be opened for lack
/// of permission stay in the set as skipped placeholders so counters and
/// ordering reflect the directory.
pub struct JournalSet<T> {
	journals: Vec<Journal<T>>,
	n_attempted: usize,
	n_opened: usize,
}

impl<T> std::fmt::Debug for JournalSet<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JournalSet")
			.field("journals", &self.journals)
			.field("n_attempted", &self.n_attempted)
			.field("n_opened", &self.n_opened)
			.finish()
	}
}

impl<T> Default for JournalSet<T> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<T> JournalSet<T> {
	pub fn empty() -> Self {
		Self {
			journals: Vec::new(),
			n_attempted: 0,
			n_opened: 0,
		}
	}

	/// Opens attempted, successful or not.
	pub fn n_attempted(&self) -> usize {
		self.n_attempted
	}

	/// Opens that produced a usable handle.
	pub fn n_opened(&self) -> usize {
		self.n_opened
	}

	pub fn is_empty(&self) -> bool {
		self.journals.is_empty()
	}
}

impl<T> JournalSet<T>
where
	T: AsyncFileRead,
{
	/// Assemble a set from already-constructed journals.
	pub fn from_journals(journals: Vec<Journal<T>>) -> Self {
		let n_attempted = journals.len();
		let n_opened = journals.iter().filter(|j| !j.is_skipped()).count();
		Self {
			journals,
			n_attempted,
			n_opened,
		}
	}

	/// Every journal that actually opened, in directory order.
	pub fn journals_mut(&mut self) -> impl Iterator<Item = &mut Journal<T>> {
		self.journals.iter_mut().filter(|j| !j.is_skipped())
	}
}

impl JournalSet<JournalFile> {
	/// Open every journal of `machine_id` under `root`.
	///
	/// Directory entries starting with `.` are not journals. Permission
	/// failures skip the one file with a warning; any other open failure
	/// fails the whole set.
	pub async fn open_host(root: &Path, machine_id: &str, mode: OpenMode) -> io::Result<Self> {
		let dir = root.join(machine_id);

		let mut names = Vec::new();
		let mut entries = tokio::fs::read_dir(&dir).await?;
		while let Some(entry) = entries.next_entry().await? {
			let name = entry.file_name().to_string_lossy().into_owned();
			if name.starts_with('.') {
				continue;
			}
			names.push(name);
		}

		if names.is_empty() {
			return Ok(Self::empty());
		}

		let opens = names.iter().map(|name| {
			let path = dir.join(name);
			async move {
				let mut options = OpenOptions::new();
				options.read(true);
				if mode == OpenMode::ReadWrite {
					options.write(true);
				}
				options.open(&path).await
			}
		});
		let results = join_all(opens).await;

		let mut set = Self::empty();
		for (name, result) in names.into_iter().zip(results) {
			set.n_attempted += 1;
			match result {
				Ok(file) => {
					set.n_opened += 1;
					set.journals.push(Journal::new(name, JournalFile::new(file)));
				}
				Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
					warn!("Permission denied opening \"{name}\", ignoring");
					set.journals.push(Journal::skipped(name));
				}
				Err(err) => return Err(err),
			}
		}

		Ok(set)
	}
}

#[cfg(test)]
mod tests {
	use futures_util::io::Cursor;

	use super::*;

	#[tokio::test]
	async fn open_host_skips_dotfiles() {
		let dir = tempfile::tempdir().unwrap();
		let host = dir.path().join("abc123");
		std::fs::create_dir(&host).unwrap();
		std::fs::write(host.join("system.journal"), b"x").unwrap();
		std::fs::write(host.join(".hidden"), b"x").unwrap();
		std::fs::write(host.join(".#system.journal.lock"), b"x").unwrap();

		let set = JournalSet::open_host(dir.path(), "abc123", OpenMode::ReadOnly)
			.await
			.unwrap();
		assert_eq!(set.n_attempted(), 1);
		assert_eq!(set.n_opened(), 1);
	}

	#[tokio::test]
	async fn open_host_with_empty_directory_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let host = dir.path().join("abc123");
		std::fs::create_dir(&host).unwrap();

		let set = JournalSet::open_host(dir.path(), "abc123", OpenMode::ReadOnly)
			.await
			.unwrap();
		assert!(set.is_empty());
		assert_eq!(set.n_attempted(), 0);
	}

	#[tokio::test]
	async fn open_host_without_host_directory_fails() {
		let dir = tempfile::tempdir().unwrap();
		let err = JournalSet::open_host(dir.path(), "missing", OpenMode::ReadOnly)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::NotFound);
	}

	#[tokio::test]
	async fn skipped_journals_are_not_iterated() {
		let mut set = JournalSet::from_journals(vec![
			Journal::new("one.journal", Cursor::new(Vec::new())),
			Journal::skipped("two.journal"),
			Journal::new("three.journal", Cursor::new(Vec::new())),
		]);

		assert_eq!(set.n_attempted(), 3);
		assert_eq!(set.n_opened(), 2);
		let names: Vec<_> = set.journals_mut().map(|j| j.name().to_string()).collect();
		assert_eq!(names, ["one.journal", "three.journal"]);
	}
}
