use std::hash::Hasher;

use siphasher::sip::SipHasher24;

use crate::header::Header;

/// Hash a hashed object's (decompressed) payload the way this file does.
///
/// Keyed files use SipHash-2-4 keyed by the file id; older files use the
/// Jenkins lookup3 64-bit hash.
pub fn payload_hash(header: &Header, payload: &[u8]) -> u64 {
	hash_payload(header.is_keyed_hash(), header.file_id, payload)
}

/// The same selection without a parsed header in hand.
pub fn hash_payload(keyed: bool, file_id: u128, payload: &[u8]) -> u64 {
	if keyed {
		siphash24(payload, &file_id.to_le_bytes())
	} else {
		jenkins_hash64(payload)
	}
}

pub fn siphash24(data: &[u8], key: &[u8; 16]) -> u64 {
	let mut hasher = SipHasher24::new_with_key(key);
	hasher.write(data);
	hasher.finish()
}

/// 64-bit Jenkins lookup3 hash: `hashlittle2` with zero seeds, primary
/// word in the high half.
pub fn jenkins_hash64(data: &[u8]) -> u64 {
	let (pc, pb) = hashlittle2(data, 0, 0);
	((pc as u64) << 32) | pb as u64
}

fn hashlittle2(data: &[u8], pc: u32, pb: u32) -> (u32, u32) {
	let mut a = 0xdeadbeefu32
		.wrapping_add(data.len() as u32)
		.wrapping_add(pc);
	let mut b = a;
	let mut c = a.wrapping_add(pb);

	let mut k = data;
	while k.len() > 12 {
		a = a.wrapping_add(u32::from_le_bytes(k[0..4].try_into().unwrap()));
		b = b.wrapping_add(u32::from_le_bytes(k[4..8].try_into().unwrap()));
		c = c.wrapping_add(u32::from_le_bytes(k[8..12].try_into().unwrap()));
		(a, b, c) = mix(a, b, c);
		k = &k[12..];
	}

	if k.is_empty() {
		return (c, b);
	}

	// Tail of 1..=12 bytes, assembled into the three words little-endian.
	let mut words = [0u32; 3];
	for (i, &byte) in k.iter().enumerate() {
		words[i / 4] |= (byte as u32) << (8 * (i % 4));
	}
	a = a.wrapping_add(words[0]);
	b = b.wrapping_add(words[1]);
	c = c.wrapping_add(words[2]);

	let (_, b, c) = final_mix(a, b, c);
	(c, b)
}

fn mix(mut a: u32, mut b: u32, mut c: u32) -> (u32, u32, u32) {
	a = a.wrapping_sub(c);
	a ^= c.rotate_left(4);
	c = c.wrapping_add(b);
	b = b.wrapping_sub(a);
	b ^= a.rotate_left(6);
	a = a.wrapping_add(c);
	c = c.wrapping_sub(b);
	c ^= b.rotate_left(8);
	b = b.wrapping_add(a);
	a = a.wrapping_sub(c);
	a ^= c.rotate_left(16);
	c = c.wrapping_add(b);
	b = b.wrapping_sub(a);
	b ^= a.rotate_left(19);
	a = a.wrapping_add(c);
	c = c.wrapping_sub(b);
	c ^= b.rotate_left(4);
	b = b.wrapping_add(a);
	(a, b, c)
}

fn final_mix(mut a: u32, mut b: u32, mut c: u32) -> (u32, u32, u32) {
	c ^= b;
	c = c.wrapping_sub(b.rotate_left(14));
	a ^= c;
	a = a.wrapping_sub(c.rotate_left(11));
	b ^= a;
	b = b.wrapping_sub(a.rotate_left(25));
	c ^= b;
	c = c.wrapping_sub(b.rotate_left(16));
	a ^= c;
	a = a.wrapping_sub(c.rotate_left(4));
	b ^= a;
	b = b.wrapping_sub(a.rotate_left(14));
	c ^= b;
	c = c.wrapping_sub(b.rotate_left(24));
	(a, b, c)
}
