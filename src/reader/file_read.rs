use std::io::{self, SeekFrom};

use futures_io::{AsyncRead, AsyncSeek};
use futures_util::io::{AsyncReadExt, AsyncSeekExt};

/// Random-access file handle the engine reads journals through.
///
/// Everything is expressed over positioned reads so the engine stays
/// agnostic of where bytes come from; implementations exist for tokio files
/// and in-memory cursors.
#[allow(async_fn_in_trait)]
pub trait AsyncFileRead: AsyncRead + AsyncSeek + Unpin {
	/// Read at `offset` until `buf` is full or EOF is reached.
	///
	/// Returns the number of bytes read; callers decide whether a short
	/// read is acceptable.
	async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		self.seek(SeekFrom::Start(offset)).await?;

		let mut n = 0;
		while n < buf.len() {
			let m = self.read(&mut buf[n..]).await?;
			if m == 0 {
				break;
			}
			n += m;
		}
		Ok(n)
	}

	/// Current size of the file in bytes.
	async fn file_size(&mut self) -> io::Result<u64> {
		self.seek(SeekFrom::End(0)).await
	}

	/// Truncate the file to `len` bytes.
	///
	/// Supported only by writable on-disk handles.
	async fn truncate(&mut self, _len: u64) -> io::Result<()> {
		Err(io::Error::new(
			io::ErrorKind::Unsupported,
			"this handle cannot truncate",
		))
	}
}
