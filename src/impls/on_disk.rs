use std::{
	io,
	pin::Pin,
	task::{Context, Poll},
};

use futures_io::{AsyncRead, AsyncSeek};
use tokio::{fs::File, io::ReadBuf};

use crate::reader::AsyncFileRead;

/// An open on-disk journal, adapting a tokio [`File`] to the engine's
/// futures-io interface.
pub struct JournalFile {
	file: File,
	seek_in_flight: bool,
}

impl JournalFile {
	pub fn new(file: File) -> Self {
		Self {
			file,
			seek_in_flight: false,
		}
	}
}

impl From<File> for JournalFile {
	fn from(file: File) -> Self {
		Self::new(file)
	}
}

impl AsyncSeek for JournalFile {
	fn poll_seek(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		pos: io::SeekFrom,
	) -> Poll<io::Result<u64>> {
		use tokio::io::AsyncSeek as _;

		let this = self.get_mut();

		if !this.seek_in_flight {
			if let Err(err) = Pin::new(&mut this.file).start_seek(pos) {
				return Poll::Ready(Err(err));
			}
			this.seek_in_flight = true;
		}

		match Pin::new(&mut this.file).poll_complete(cx) {
			Poll::Ready(result) => {
				this.seek_in_flight = false;
				Poll::Ready(result)
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl AsyncRead for JournalFile {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut [u8],
	) -> Poll<io::Result<usize>> {
		use tokio::io::AsyncRead as _;

		let this = self.get_mut();
		let mut read_buf = ReadBuf::new(buf);
		match Pin::new(&mut this.file).poll_read(cx, &mut read_buf) {
			Poll::Ready(Ok(())) => {
				let n = read_buf.filled().len();
				Poll::Ready(Ok(n))
			}
			Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
			Poll::Pending => Poll::Pending,
		}
	}
}

impl AsyncFileRead for JournalFile {
	async fn file_size(&mut self) -> io::Result<u64> {
		self.file.metadata().await.map(|meta| meta.len())
	}

	async fn truncate(&mut self, len: u64) -> io::Result<()> {
		self.file.set_len(len).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reader::AsyncFileRead as _;

	#[tokio::test]
	async fn positioned_reads_and_size() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("a.journal");
		std::fs::write(&path, b"0123456789").unwrap();

		let mut file = JournalFile::new(File::open(&path).await.unwrap());
		assert_eq!(file.file_size().await.unwrap(), 10);

		let mut buf = [0u8; 4];
		let n = file.read_at(&mut buf, 3).await.unwrap();
		assert_eq!(n, 4);
		assert_eq!(&buf, b"3456");

		// Reading past EOF is a short read, not an error.
		let n = file.read_at(&mut buf, 8).await.unwrap();
		assert_eq!(n, 2);
	}

	#[tokio::test]
	async fn truncate_shortens_the_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("a.journal");
		std::fs::write(&path, b"0123456789").unwrap();

		let file = tokio::fs::OpenOptions::new()
			.read(true)
			.write(true)
			.open(&path)
			.await
			.unwrap();
		let mut file = JournalFile::new(file);
		file.truncate(4).await.unwrap();
		assert_eq!(file.file_size().await.unwrap(), 4);
		assert_eq!(std::fs::read(&path).unwrap(), b"0123");
	}
}
