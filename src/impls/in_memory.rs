use std::io;

use futures_util::io::Cursor;

use crate::reader::AsyncFileRead;

impl AsyncFileRead for Cursor<&[u8]> {}

impl AsyncFileRead for Cursor<Vec<u8>> {
	async fn truncate(&mut self, len: u64) -> io::Result<()> {
		self.get_mut().truncate(len as usize);
		Ok(())
	}
}
