/// A version counter stored next to an address inside a [PackedWord].
///
/// Only the [TAG_BIT_LENGTH] least significant bits are meaningful. Tags wrap around to 0 once
/// they exceed [TAG_MASK], so only equality between tags carries information, never ordering.
pub type Tag = u64;

/// A u64 which stores an address in its [ADDRESS_BIT_LENGTH] least significant bits and a [Tag]
/// in the remaining bits. This combination allows us to CAS both pieces of information in one
/// operation.
pub(crate) type PackedWord = u64;

/// The number of bits reserved for an address inside a [PackedWord].
///
/// On 32-bit targets the whole address fits and the tag gets the other 32 bits.
///
/// On 64-bit targets every address stored in a tagged word must have its upper 16 bits clear.
/// That holds for user-space heap pointers under x86-64 4-level paging and aarch64 48-bit VA,
/// but not for top-byte-tagged pointers (aarch64 TBI, MTE, Android's Scudo) or mappings above
/// 2^48 under x86-64 5-level paging. [crate::TaggedPtr::new] panics on such an address rather
/// than silently truncating it.
pub const ADDRESS_BIT_LENGTH: u32 = if usize::BITS >= 64 { 48 } else { usize::BITS };

/// The number of bits left over for the [Tag]. 16 on 64-bit targets, 32 on 32-bit targets.
pub const TAG_BIT_LENGTH: u32 = PackedWord::BITS - ADDRESS_BIT_LENGTH;

/// The mask to AND with a [PackedWord] in order to extract the address.
const ADDRESS_MASK: PackedWord = !(PackedWord::MAX << ADDRESS_BIT_LENGTH);

/// The largest representable [Tag]. Incrementing past it wraps around to 0.
pub const TAG_MASK: Tag = !(Tag::MAX << TAG_BIT_LENGTH);

/// Whether `address` can be stored in a [PackedWord] without losing bits.
pub(crate) fn address_fits(address: usize) -> bool {
    (address as PackedWord) & !ADDRESS_MASK == 0
}

/// Construct a number containing both an address and a [Tag].
///
/// The address takes up the [ADDRESS_BIT_LENGTH] least significant bits and the tag takes up the
/// rest. Bits of `tag` beyond [TAG_BIT_LENGTH] are discarded. `address` must satisfy
/// [address_fits], which [crate::TaggedPtr::new] checks.
pub(crate) fn construct_address_and_tag(address: usize, tag: Tag) -> PackedWord {
    debug_assert!(
        address_fits(address),
        "address {address:#x} does not fit in {ADDRESS_BIT_LENGTH} bits"
    );
    let address: PackedWord = address as PackedWord;
    (tag & TAG_MASK) << ADDRESS_BIT_LENGTH | (address & ADDRESS_MASK)
}

/// Extract the address out of a number which holds both an address and a [Tag].
pub(crate) fn extract_address_from_address_and_tag(address_and_tag: PackedWord) -> usize {
    (address_and_tag & ADDRESS_MASK) as usize
}

/// Extract the [Tag] out of a number which holds both an address and a [Tag].
pub(crate) fn extract_tag_from_address_and_tag(address_and_tag: PackedWord) -> Tag {
    address_and_tag >> ADDRESS_BIT_LENGTH
}

/// The tag which must accompany the next successful modification of a word currently carrying
/// `tag`.
pub(crate) fn next_tag(tag: Tag) -> Tag {
    tag.wrapping_add(1) & TAG_MASK
}
