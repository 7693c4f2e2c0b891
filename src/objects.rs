use std::fmt::Display;

pub use self::data::*;
pub use self::entry::*;
pub use self::entry_array::*;
pub use self::field::*;
pub use self::header::*;
pub use self::tag::*;

mod data;
mod entry;
mod entry_array;
mod field;
mod header;
mod tag;

use crate::tables::{parse_hash_table, HashItem};

pub(crate) fn invalid_data(err: impl Display) -> std::io::Error {
	std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
}

/// A fully loaded hash table object (data or field flavour).
#[derive(Debug, Clone, PartialEq)]
pub struct HashTableObject {
	pub object: ObjectHeader,
	pub items: Vec<HashItem>,
}

/// Any fully loaded object, decoded per its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
	Data(DataObject),
	Field(FieldObject),
	Entry(EntryObject),
	DataHashTable(HashTableObject),
	FieldHashTable(HashTableObject),
	EntryArray(EntryArrayObject),
	Tag(TagObject),
}

impl Object {
	/// Decode a whole object from the `size` bytes at its offset.
	///
	/// `Unused` and unknown types are rejected: they have no decodable body.
	pub fn parse(buf: &[u8], compact: bool) -> std::io::Result<Self> {
		if buf.len() < OBJECT_HEADER_SIZE as usize {
			return Err(invalid_data(format!(
				"object buffer of {} bytes cannot hold an object header",
				buf.len()
			)));
		}

		let object = ObjectHeader::parse(buf)?;
		if object.size as usize != buf.len() {
			return Err(invalid_data(format!(
				"object declares {} bytes but {} were loaded",
				object.size,
				buf.len()
			)));
		}

		let body = &buf[OBJECT_HEADER_SIZE as usize..];
		match object.r#type {
			ObjectType::Data => DataObject::parse(object, body, compact).map(Object::Data),
			ObjectType::Field => FieldObject::parse(object, body).map(Object::Field),
			ObjectType::Entry => EntryObject::parse(object, body, compact).map(Object::Entry),
			ObjectType::DataHashTable => Ok(Object::DataHashTable(HashTableObject {
				object,
				items: parse_hash_table(body)?,
			})),
			ObjectType::FieldHashTable => Ok(Object::FieldHashTable(HashTableObject {
				object,
				items: parse_hash_table(body)?,
			})),
			ObjectType::EntryArray => {
				EntryArrayObject::parse(object, body, compact).map(Object::EntryArray)
			}
			ObjectType::Tag => TagObject::parse(object, body).map(Object::Tag),
			ObjectType::Unused => Err(invalid_data("cannot load an unused object")),
			ObjectType::Unknown(t) => Err(invalid_data(format!("unknown object type {t}"))),
		}
	}

	pub fn object_header(&self) -> &ObjectHeader {
		match self {
			Object::Data(o) => &o.object,
			Object::Field(o) => &o.object,
			Object::Entry(o) => &o.object,
			Object::DataHashTable(o) | Object::FieldHashTable(o) => &o.object,
			Object::EntryArray(o) => &o.object,
			Object::Tag(o) => &o.object,
		}
	}
}
