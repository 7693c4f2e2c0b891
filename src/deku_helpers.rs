use std::num::{NonZeroU128, NonZeroU32, NonZeroU64};

use deku::{ctx::Endian, no_std_io, prelude::*};
use jiff::Timestamp;

// Zero-means-absent integer fields. The explicit writers matter: deku's
// derived behavior for a None option is to write nothing, which would
// shift every following field.

macro_rules! nonzero_helpers {
	($reader:ident, $writer:ident, $raw:ty, $nonzero:ty) => {
		pub fn $reader<R: no_std_io::Read + no_std_io::Seek>(
			reader: &mut Reader<R>,
		) -> Result<Option<$nonzero>, DekuError> {
			<$raw>::from_reader_with_ctx(reader, Endian::Little).map(<$nonzero>::new)
		}

		pub fn $writer<W: std::io::Write + std::io::Seek>(
			writer: &mut Writer<W>,
			field: &Option<$nonzero>,
		) -> Result<(), DekuError> {
			field
				.map(<$nonzero>::get)
				.unwrap_or_default()
				.to_writer(writer, Endian::Little)
		}
	};
}

nonzero_helpers!(reader_nonzero_u32, writer_nonzero_u32, u32, NonZeroU32);
nonzero_helpers!(reader_nonzero_u64, writer_nonzero_u64, u64, NonZeroU64);
nonzero_helpers!(reader_nonzero_u128, writer_nonzero_u128, u128, NonZeroU128);

pub fn reader_realtime<R: no_std_io::Read + no_std_io::Seek>(
	reader: &mut Reader<R>,
) -> Result<Timestamp, DekuError> {
	let value = u64::from_reader_with_ctx(reader, Endian::Little)?;
	Timestamp::from_microsecond(value.try_into()?)
		.map_err(|err| DekuError::Assertion(format!("Invalid timestamp: {err}").into()))
}

pub fn writer_realtime<W: std::io::Write + std::io::Seek>(
	writer: &mut Writer<W>,
	field: &Timestamp,
) -> Result<(), DekuError> {
	let value: u64 = field.as_microsecond().try_into()?;
	value.to_writer(writer, Endian::Little)
}

pub fn reader_realtime_opt<R: no_std_io::Read + no_std_io::Seek>(
	reader: &mut Reader<R>,
) -> Result<Option<Timestamp>, DekuError> {
	let value = u64::from_reader_with_ctx(reader, Endian::Little)?;
	if value == 0 {
		return Ok(None);
	}

	Timestamp::from_microsecond(value.try_into()?)
		.map_err(|err| DekuError::Assertion(format!("Invalid timestamp: {err}").into()))
		.map(Some)
}

pub fn writer_realtime_opt<W: std::io::Write + std::io::Seek>(
	writer: &mut Writer<W>,
	field: &Option<Timestamp>,
) -> Result<(), DekuError> {
	let value: u64 = field
		.map(|ts| ts.as_microsecond())
		.unwrap_or_default()
		.try_into()?;
	value.to_writer(writer, Endian::Little)
}
