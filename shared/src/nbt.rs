//! NBT documents in the network form of this protocol revision.
//!
//! Documents are built from `simdnbt`'s owned types. Protocol 759 sends them
//! as a root compound with an empty name; later revisions drop the name, so
//! the root is always produced through [`network_root`].

pub use simdnbt::owned::{BaseNbt, NbtCompound, NbtList, NbtTag};

/// Wraps `compound` as a nameless network root.
pub fn network_root(compound: NbtCompound) -> BaseNbt {
    BaseNbt::new("", compound)
}

/// Builds a compound from name/tag pairs, keeping their order.
pub fn compound<'a>(entries: impl IntoIterator<Item = (&'a str, NbtTag)>) -> NbtCompound {
    NbtCompound::from_values(
        entries
            .into_iter()
            .map(|(name, tag)| (name.into(), tag))
            .collect(),
    )
}

/// String tag.
pub fn string(value: &str) -> NbtTag {
    NbtTag::String(value.into())
}

/// NBT has no boolean; flags are bytes.
pub fn flag(value: bool) -> NbtTag {
    NbtTag::Byte(value as i8)
}

/// Encodes a root document.
pub fn to_bytes(root: &BaseNbt) -> Vec<u8> {
    let mut out = Vec::new();
    root.write(&mut out);
    out
}
