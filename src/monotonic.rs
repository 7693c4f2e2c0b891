use deku::prelude::*;

/// Monotonic timestamp (microseconds since boot, `CLOCK_MONOTONIC`).
///
/// Zero is admitted: this crate reads files it did not write, and a corrupt
/// or hand-built file may carry one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, DekuRead, DekuWrite)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
pub struct Monotonic(pub u64);

impl Monotonic {
	pub const fn new(ts: u64) -> Self {
		Self(ts)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}
