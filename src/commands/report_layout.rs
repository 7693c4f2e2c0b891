use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt as _;

use crate::{
	objects::{align64, ObjectHeader},
	reader::AsyncFileRead,
	set::JournalSet,
};

/// Page size the layout markers are computed against.
pub const LAYOUT_PAGE_SIZE: u64 = 4096;

/// Write a `<name>.layout` file per journal into `out_dir`.
///
/// Returns the paths written, in journal order.
pub async fn run<T>(set: &mut JournalSet<T>, out_dir: &Path) -> io::Result<Vec<PathBuf>>
where
	T: AsyncFileRead,
{
	let mut written = Vec::new();

	for journal in set.journals_mut() {
		let header = journal.get_header().await?;

		let mut out = String::new();
		writeln!(out, "Layout for \"{}\"", journal.name()).unwrap();
		out.push_str(concat!(
			"Legend:\n",
			"?     OBJECT_UNUSED\n",
			"d     OBJECT_DATA\n",
			"f     OBJECT_FIELD\n",
			"e     OBJECT_ENTRY\n",
			"D     OBJECT_DATA_HASH_TABLE\n",
			"F     OBJECT_FIELD_HASH_TABLE\n",
			"A     OBJECT_ENTRY_ARRAY\n",
			"T     OBJECT_TAG\n\n",
		));
		writeln!(
			out,
			"|N|    object spans N page boundaries (page size used={LAYOUT_PAGE_SIZE})"
		)
		.unwrap();
		out.push_str(concat!(
			"|      single page boundary\n",
			"+N     N bytes of alignment padding\n",
			"+      single byte alignment padding\n\n",
		));

		{
			let mut objects = journal.iter_objects(&header);
			while let Some(next) = objects.next().await {
				let (offset, object) = next?;
				out.push_str(&token(offset, &object));
			}
		}
		out.push('\n');

		let path = out_dir.join(format!("{}.layout", journal.name()));
		tokio::fs::write(&path, &out).await?;
		written.push(path);
	}

	Ok(written)
}

fn token(offset: u64, object: &ObjectHeader) -> String {
	let this_page = offset & !(LAYOUT_PAGE_SIZE - 1);
	let next_page = (offset + object.size + LAYOUT_PAGE_SIZE - 1) & !(LAYOUT_PAGE_SIZE - 1);
	let page_delta = next_page - this_page;

	let boundary_marker = if page_delta > LAYOUT_PAGE_SIZE * 2 {
		format!("|{}|", page_delta / LAYOUT_PAGE_SIZE - 1)
	} else if page_delta > LAYOUT_PAGE_SIZE {
		"|".to_string()
	} else {
		String::new()
	};

	let aligned_delta = align64(object.size) - object.size;
	let alignment_marker = if aligned_delta > 1 {
		format!("+{aligned_delta}")
	} else if aligned_delta == 1 {
		"+".to_string()
	} else {
		String::new()
	};

	format!(
		"{}{}{}{}{} ",
		if this_page == offset { "| " } else { "" },
		object.r#type.type_char(),
		boundary_marker,
		object.size,
		alignment_marker,
	)
}

#[cfg(test)]
mod tests {
	use crate::{
		objects::{DataCompression, ObjectType},
		reader::Journal,
		testutil::JournalBuilder,
	};

	use super::*;

	fn object(r#type: ObjectType, size: u64) -> ObjectHeader {
		ObjectHeader {
			r#type,
			compression: DataCompression::None,
			size,
		}
	}

	#[test]
	fn tokens_carry_type_size_and_markers() {
		// Object starting exactly on a page gets the page-start marker.
		assert_eq!(token(4096, &object(ObjectType::Entry, 88)), "| e88 ");

		// Unaligned sizes get padding markers.
		assert_eq!(token(272, &object(ObjectType::Data, 87)), "d87+ ");
		assert_eq!(token(272, &object(ObjectType::Field, 83)), "f83+5 ");

		// An object reaching into the next page gets a boundary marker.
		assert_eq!(token(4000, &object(ObjectType::Data, 800)), "d|800 ");

		// Spanning several pages reports how many boundaries are crossed.
		assert_eq!(
			token(4096, &object(ObjectType::EntryArray, 3 * 4096)),
			"| A|2|12288 ",
		);
	}

	#[tokio::test]
	async fn layout_report_is_idempotent() {
		let fixture = JournalBuilder::new().build();
		let dir = tempfile::tempdir().unwrap();

		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let first = run(&mut set, dir.path()).await.unwrap();
		assert_eq!(first, vec![dir.path().join("system.journal.layout")]);
		let first_bytes = std::fs::read(&first[0]).unwrap();

		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		let second = run(&mut set, dir.path()).await.unwrap();
		let second_bytes = std::fs::read(&second[0]).unwrap();

		assert_eq!(first_bytes, second_bytes);
	}

	#[tokio::test]
	async fn layout_lists_every_object_in_order() {
		let fixture = JournalBuilder::new().build();
		let dir = tempfile::tempdir().unwrap();

		let mut set = JournalSet::from_journals(vec![Journal::new(
			"system.journal",
			fixture.cursor(),
		)]);
		run(&mut set, dir.path()).await.unwrap();

		let text = std::fs::read_to_string(dir.path().join("system.journal.layout")).unwrap();
		let tokens: Vec<&str> = text
			.rsplit("\n\n")
			.next()
			.unwrap()
			.split_whitespace()
			.filter(|t| *t != "|")
			.collect();

		// One token per object, leading with the type letter.
		let types: String = tokens
			.iter()
			.map(|t| t.chars().next().unwrap())
			.collect();
		let expected: String = fixture
			.object_offsets
			.iter()
			.map(|(_, r#type, _)| r#type.type_char())
			.collect();
		assert_eq!(types, expected);
	}
}
