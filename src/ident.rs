use std::io;
use std::path::Path;

use tokio::io::AsyncReadExt;

const MACHINE_ID_PATH: &str = "/etc/machine-id";
const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";

const ID_BUF_SIZE: usize = 4096;

/// One-shot open/read/close of a small (pseudo-)file.
///
/// Reads from offset 0 until `buf` is full or EOF; returns the length read.
pub async fn readfile(path: impl AsRef<Path>, buf: &mut [u8]) -> io::Result<usize> {
	let mut file = tokio::fs::File::open(path).await?;

	let mut n = 0;
	while n < buf.len() {
		let m = file.read(&mut buf[n..]).await?;
		if m == 0 {
			break;
		}
		n += m;
	}
	Ok(n)
}

/// The host machine id, as the hex string journald names directories with.
pub async fn machine_id() -> io::Result<String> {
	machine_id_at(MACHINE_ID_PATH).await
}

/// The current boot id, hyphens stripped to match entry metadata.
pub async fn boot_id() -> io::Result<String> {
	boot_id_at(BOOT_ID_PATH).await
}

pub async fn machine_id_at(path: impl AsRef<Path>) -> io::Result<String> {
	let raw = read_id(path).await?;
	validate_id(raw)
}

pub async fn boot_id_at(path: impl AsRef<Path>) -> io::Result<String> {
	let raw = read_id(path).await?;
	validate_id(raw.chars().filter(|&c| c != '-').collect())
}

async fn read_id(path: impl AsRef<Path>) -> io::Result<String> {
	let mut buf = [0u8; ID_BUF_SIZE];
	let n = readfile(path, &mut buf).await?;

	let text = std::str::from_utf8(&buf[..n])
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
	Ok(text.trim_end_matches('\n').to_string())
}

// The id names a directory under the journal root, so insist on the exact
// 128-bit-hex shape before using it in a path.
fn validate_id(id: String) -> io::Result<String> {
	let decoded = hex::decode(&id)
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad id \"{id}\": {e}")))?;
	if decoded.len() != 16 {
		return Err(io::Error::new(
			io::ErrorKind::InvalidData,
			format!("id \"{id}\" is {} bytes, expected 16", decoded.len()),
		));
	}
	Ok(id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn machine_id_trims_trailing_newline() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("machine-id");
		std::fs::write(&path, "c444c71c038d45b0af201444a83b91c9\n").unwrap();

		let id = machine_id_at(&path).await.unwrap();
		assert_eq!(id, "c444c71c038d45b0af201444a83b91c9");
	}

	#[tokio::test]
	async fn boot_id_strips_hyphens() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("boot_id");
		std::fs::write(&path, "82eda8af-5580-4abe-8eca-8efb4072c698\n").unwrap();

		let id = boot_id_at(&path).await.unwrap();
		assert_eq!(id, "82eda8af55804abe8eca8efb4072c698");
	}

	#[tokio::test]
	async fn readfile_reports_length() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("small");
		std::fs::write(&path, b"abc").unwrap();

		let mut buf = [0u8; 16];
		let n = readfile(&path, &mut buf).await.unwrap();
		assert_eq!(n, 3);
		assert_eq!(&buf[..n], b"abc");
	}

	#[tokio::test]
	async fn malformed_id_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("machine-id");
		std::fs::write(&path, "../../../etc/shadow\n").unwrap();

		let err = machine_id_at(&path).await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);

		std::fs::write(&path, "c444c71c\n").unwrap();
		let err = machine_id_at(&path).await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);
	}

	#[tokio::test]
	async fn missing_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let mut buf = [0u8; 16];
		assert!(readfile(dir.path().join("nope"), &mut buf).await.is_err());
	}
}
