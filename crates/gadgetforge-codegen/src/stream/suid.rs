//! Default serialVersionUID computation for array classes
//!
//! Array classes never declare a serialVersionUID, so the stream carries
//! the JVM's computed default: SHA-1 over the class name and modifiers,
//! first eight digest bytes read little-endian. Arrays contribute no
//! interfaces, fields, constructors or methods to the hash.

use sha1::{Digest, Sha1};

/// `public final abstract`, the masked modifiers of every public array class
const ARRAY_MODIFIERS: i32 = 0x0411;

/// Default serialVersionUID of the array class with binary name `name`
pub fn array_suid(name: &str) -> i64 {
    let mut data = Vec::with_capacity(name.len() + 6);
    write_utf(&mut data, name);
    data.extend_from_slice(&ARRAY_MODIFIERS.to_be_bytes());

    let digest = Sha1::digest(&data);
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(first)
}

/// `DataOutput.writeUTF` for names, which are plain ASCII in practice
fn write_utf(out: &mut Vec<u8>, s: &str) {
    let encoded = super::writer::modified_utf8(s);
    out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
    out.extend_from_slice(&encoded);
}
