use std::io;

use tracing::trace;

use crate::reader::AsyncFileRead;

/// Size of one cache page.
pub const PAGE_SIZE: usize = 8192;

/// Pages kept per journal.
pub const N_PAGES: usize = 8;

struct Page {
	buf: Box<[u8]>,
	offset: u64,
	length: usize,
	valid: bool,
}

impl Page {
	fn covers(&self, offset: u64, len: usize) -> bool {
		self.valid && offset >= self.offset && offset + len as u64 <= self.offset + self.length as u64
	}
}

/// A small LRU of whole pages fronting one journal's reads.
///
/// Any read of at most [`PAGE_SIZE`] bytes is satisfied from a covering
/// page, filling one on demand; pages are recycled least-recently-used
/// first. Reads larger than a page bypass the cache entirely.
pub struct ReadCache {
	// Recency order: first page is the least recently used.
	pages: Vec<Page>,
}

impl Default for ReadCache {
	fn default() -> Self {
		Self::new()
	}
}

impl ReadCache {
	pub fn new() -> Self {
		Self {
			pages: (0..N_PAGES)
				.map(|_| Page {
					buf: vec![0; PAGE_SIZE].into_boxed_slice(),
					offset: 0,
					length: 0,
					valid: false,
				})
				.collect(),
		}
	}

	/// Fill `buf` from `offset`, going to `io` only on a cache miss.
	///
	/// A read that cannot be fully satisfied (EOF inside the requested
	/// range) is an invalid-format error.
	pub async fn read<T: AsyncFileRead>(
		&mut self,
		io: &mut T,
		buf: &mut [u8],
		offset: u64,
	) -> io::Result<()> {
		debug_assert!(buf.len() <= PAGE_SIZE);

		if let Some(i) = self.pages.iter().position(|p| p.covers(offset, buf.len())) {
			let page = self.pages.remove(i);
			let start = (offset - page.offset) as usize;
			buf.copy_from_slice(&page.buf[start..start + buf.len()]);
			trace!(offset, len = buf.len(), "cache hit");
			self.pages.push(page);
			return Ok(());
		}

		// Recycle the least recently used page. It stays out of the list,
		// invalid, while the read is in flight.
		let mut page = self.pages.remove(0);
		page.valid = false;

		let result = io.read_at(&mut page.buf, offset).await;
		let n = match result {
			Ok(n) => n,
			Err(err) => {
				self.pages.insert(0, page);
				return Err(err);
			}
		};

		if n < buf.len() {
			self.pages.insert(0, page);
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				format!("read of {} bytes at {offset} returned only {n}", buf.len()),
			));
		}

		page.offset = offset;
		page.length = n;
		page.valid = true;
		buf.copy_from_slice(&page.buf[..buf.len()]);
		trace!(offset, len = buf.len(), filled = n, "cache fill");
		self.pages.push(page);

		Ok(())
	}

	#[cfg(test)]
	pub(crate) fn page_states(&self) -> Vec<(u64, usize, bool)> {
		self.pages.iter().map(|p| (p.offset, p.length, p.valid)).collect()
	}
}

#[cfg(test)]
mod tests {
	use std::pin::Pin;
	use std::task::{Context, Poll};

	use futures_io::{AsyncRead, AsyncSeek};
	use futures_util::io::Cursor;

	use super::*;

	/// Cursor wrapper that records every positioned read it serves.
	struct CountingIo {
		inner: Cursor<Vec<u8>>,
		reads: Vec<(u64, usize)>,
	}

	impl CountingIo {
		fn new(data: Vec<u8>) -> Self {
			Self { inner: Cursor::new(data), reads: Vec::new() }
		}
	}

	impl AsyncRead for CountingIo {
		fn poll_read(
			mut self: Pin<&mut Self>,
			cx: &mut Context<'_>,
			buf: &mut [u8],
		) -> Poll<io::Result<usize>> {
			Pin::new(&mut self.inner).poll_read(cx, buf)
		}
	}

	impl AsyncSeek for CountingIo {
		fn poll_seek(
			mut self: Pin<&mut Self>,
			cx: &mut Context<'_>,
			pos: io::SeekFrom,
		) -> Poll<io::Result<u64>> {
			Pin::new(&mut self.inner).poll_seek(cx, pos)
		}
	}

	impl AsyncFileRead for CountingIo {
		async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
			self.reads.push((offset, buf.len()));
			self.inner.read_at(buf, offset).await
		}
	}

	fn sample(len: usize) -> Vec<u8> {
		(0..len).map(|i| (i % 251) as u8).collect()
	}

	#[tokio::test]
	async fn repeated_small_reads_hit_one_underlying_read() {
		let mut io = CountingIo::new(sample(PAGE_SIZE * 2));
		let mut cache = ReadCache::new();

		let mut first = [0u8; 16];
		cache.read(&mut io, &mut first, 100).await.unwrap();
		let mut second = [0u8; 16];
		cache.read(&mut io, &mut second, 100).await.unwrap();

		assert_eq!(first, second);
		assert_eq!(first[..], sample(PAGE_SIZE * 2)[100..116]);
		assert_eq!(io.reads, vec![(100, PAGE_SIZE)]);
	}

	#[tokio::test]
	async fn covering_page_moves_to_recent_end() {
		let data = sample(PAGE_SIZE * 16);
		let mut io = CountingIo::new(data);
		let mut cache = ReadCache::new();

		let mut buf = [0u8; 32];
		cache.read(&mut io, &mut buf, 0).await.unwrap();
		// Fill every other page so offset 0 becomes the least recent.
		for i in 1..N_PAGES {
			cache.read(&mut io, &mut buf, (i * PAGE_SIZE) as u64).await.unwrap();
		}

		cache.read(&mut io, &mut buf, 8).await.unwrap();
		let states = cache.page_states();
		assert_eq!(states.last(), Some(&(0, PAGE_SIZE, true)));
		// Covered by the page at 0, so no extra underlying read happened.
		assert_eq!(io.reads.len(), N_PAGES);
	}

	#[tokio::test]
	async fn eviction_recycles_least_recently_used() {
		let data = sample(PAGE_SIZE * 16);
		let mut io = CountingIo::new(data);
		let mut cache = ReadCache::new();

		let mut buf = [0u8; 8];
		for i in 0..N_PAGES + 1 {
			cache.read(&mut io, &mut buf, (i * PAGE_SIZE) as u64).await.unwrap();
		}

		// Page for offset 0 was recycled; reading it again goes to io.
		cache.read(&mut io, &mut buf, 0).await.unwrap();
		assert_eq!(io.reads.len(), N_PAGES + 2);
	}

	#[tokio::test]
	async fn short_fill_is_invalid_data() {
		let mut io = CountingIo::new(sample(64));
		let mut cache = ReadCache::new();

		let mut buf = [0u8; 128];
		let err = cache.read(&mut io, &mut buf, 0).await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);

		// A partial page near EOF still serves reads it fully covers.
		let mut buf = [0u8; 32];
		cache.read(&mut io, &mut buf, 16).await.unwrap();
		assert_eq!(buf[..], sample(64)[16..48]);
	}
}
