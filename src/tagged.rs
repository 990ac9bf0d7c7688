//! A pointer and a version tag packed into one atomically updatable 64-bit word.
//!
//! Comparing the whole word means a CAS only succeeds if both the address *and* the tag still
//! match. Every successful modification goes through [TaggedPtr::successor], which bumps the tag,
//! so an address which left the word and came back (the ABA pattern) is distinguishable from one
//! which never left.
//!
//! # Tag width
//!
//! The tag has [crate::TAG_BIT_LENGTH] bits: 16 on 64-bit targets, 32 on 32-bit targets. It
//! wraps, so the protection is probabilistic. A thread holding a stale snapshot is only fooled
//! if, during its stall, exactly a multiple of `2^TAG_BIT_LENGTH` successful modifications hit
//! the word and the word also ends up holding the same address again. At 16 bits that means
//! 65,536 updates in one preemption window *and* an exact address match at the end of it.
//!
//! # Address width
//!
//! The address keeps only [crate::ADDRESS_BIT_LENGTH] bits, so [TaggedPtr::new] panics on a
//! pointer with any higher bit set instead of storing a truncated one.

use core::fmt;
use core::marker::PhantomData;

use crate::err::TaggedCasError;
use crate::sync::{AtomicU64, Ordering};
use crate::types::{
    address_fits, construct_address_and_tag, extract_address_from_address_and_tag,
    extract_tag_from_address_and_tag, next_tag, PackedWord, Tag, ADDRESS_BIT_LENGTH, TAG_MASK,
};

/// A snapshot of an [AtomicTaggedPtr]: an address and the tag it was observed with.
pub struct TaggedPtr<T> {
    address: usize,
    tag: Tag,
    _marker: PhantomData<*mut T>,
}

impl<T> TaggedPtr<T> {
    /// A null address with tag 0.
    pub fn null() -> Self {
        Self::new(core::ptr::null_mut(), 0)
    }

    /// Pair `ptr` with `tag`. Only the [crate::TAG_BIT_LENGTH] least significant bits of `tag`
    /// are kept.
    ///
    /// # Panics
    /// If `ptr` has any bit at or above [crate::ADDRESS_BIT_LENGTH] set, since the packed word
    /// would otherwise hand back a different pointer.
    pub fn new(ptr: *mut T, tag: Tag) -> Self {
        let address: usize = ptr as usize;
        assert!(
            address_fits(address),
            "pointer {address:#x} does not fit in {ADDRESS_BIT_LENGTH} address bits"
        );
        Self {
            address,
            tag: tag & TAG_MASK,
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut T {
        self.address as *mut T
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    /// The value which replaces `self` when the word is modified to point at `ptr`: the tag is
    /// incremented, wrapping at [crate::TAG_BIT_LENGTH] bits.
    pub fn successor(&self, ptr: *mut T) -> Self {
        Self::new(ptr, next_tag(self.tag))
    }

    fn into_word(self) -> PackedWord {
        construct_address_and_tag(self.address, self.tag)
    }

    fn from_word(word: PackedWord) -> Self {
        Self {
            address: extract_address_from_address_and_tag(word),
            tag: extract_tag_from_address_and_tag(word),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for TaggedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TaggedPtr<T> {}

impl<T> PartialEq for TaggedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.tag == other.tag
    }
}

impl<T> Eq for TaggedPtr<T> {}

impl<T> fmt::Debug for TaggedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedPtr")
            .field("address", &(self.address as *const ()))
            .field("tag", &self.tag)
            .finish()
    }
}

impl TaggedCasError {
    /// The value the word held when the CAS failed, to retry against.
    pub fn actual<T>(&self) -> TaggedPtr<T> {
        TaggedPtr::new(self.actual_address() as *mut T, self.actual_tag())
    }
}

/// An atomic [TaggedPtr].
pub struct AtomicTaggedPtr<T> {
    word: AtomicU64,
    _marker: PhantomData<*mut T>,
}

// SAFETY: the type is a plain atomic integer; what the address points to is the owner's concern.
unsafe impl<T> Send for AtomicTaggedPtr<T> {}
unsafe impl<T> Sync for AtomicTaggedPtr<T> {}

impl<T> AtomicTaggedPtr<T> {
    pub fn new(value: TaggedPtr<T>) -> Self {
        Self {
            word: AtomicU64::new(value.into_word()),
            _marker: PhantomData,
        }
    }

    pub fn null() -> Self {
        Self::new(TaggedPtr::null())
    }

    pub fn load(&self, ordering: Ordering) -> TaggedPtr<T> {
        TaggedPtr::from_word(self.word.load(ordering))
    }

    /// Replace `current` with `new` if, and only if, both the address and the tag still match.
    ///
    /// On failure, the error tells apart a word whose address changed from one whose address is
    /// the same but whose tag moved on; the latter is exactly the ABA case an untagged CAS would
    /// have accepted.
    pub fn compare_exchange(
        &self,
        current: TaggedPtr<T>,
        new: TaggedPtr<T>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<TaggedPtr<T>, TaggedCasError> {
        match self
            .word
            .compare_exchange(current.into_word(), new.into_word(), success, failure)
        {
            Ok(previous_word) => Ok(TaggedPtr::from_word(previous_word)),
            Err(actual_word) => {
                let actual: TaggedPtr<T> = TaggedPtr::from_word(actual_word);
                if actual.address == current.address {
                    Err(TaggedCasError::StaleTag {
                        actual_address: actual.address,
                        actual_tag: actual.tag,
                        expected_tag: current.tag,
                    })
                } else {
                    Err(TaggedCasError::Changed {
                        actual_address: actual.address,
                        actual_tag: actual.tag,
                    })
                }
            }
        }
    }
}

impl<T> Default for AtomicTaggedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for AtomicTaggedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(Ordering::Relaxed), f)
    }
}
