//! Placeholder chunk payloads.
//!
//! Only empty chunks are produced: every section is air with a single biome,
//! written as single-valued paletted containers.

/// Blocks per section edge; a section spans 16 blocks vertically.
pub const SECTION_HEIGHT: u32 = 16;

/// Registry id of air in the block-state palette.
const AIR: i32 = 0;

/// Registry id of the only biome the dimension codec declares.
const DEFAULT_BIOME: i32 = 0;

/// Serializes the section data for an empty chunk column `height` blocks tall.
pub fn empty_chunk_sections(height: u32) -> Vec<u8> {
    let sections = height / SECTION_HEIGHT;
    let mut buf = Vec::with_capacity(sections as usize * 8);
    for _ in 0..sections {
        // Non-air block count.
        buf.extend_from_slice(&0i16.to_be_bytes());
        write_single_valued(&mut buf, AIR);
        write_single_valued(&mut buf, DEFAULT_BIOME);
    }
    buf
}

/// A paletted container with zero bits per entry holds exactly one value
/// and no data array.
fn write_single_valued(buf: &mut Vec<u8>, value: i32) {
    buf.push(0);
    crate::codec::write_varint(buf, value);
    crate::codec::write_varint(buf, 0);
}
