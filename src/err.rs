use crate::types::Tag;
use displaydoc::Display;

/// A CAS on a tagged word failed because the word no longer held the expected address and tag.
///
/// This is the normal outcome of losing a race and is resolved by retrying against the observed
/// value, which can be recovered with [TaggedCasError::actual].
#[derive(Debug, Display, Clone, Copy, Eq, PartialEq)]
pub enum TaggedCasError {
    /** The word held address {actual_address:#x} with tag {actual_tag}, but the expected tag was
        {expected_tag}: the address was reused since it was observed.
    */
    StaleTag {
        actual_address: usize,
        actual_tag: Tag,
        expected_tag: Tag,
    },
    /// The word held address {actual_address:#x} with tag {actual_tag}.
    Changed { actual_address: usize, actual_tag: Tag },
}

impl TaggedCasError {
    /// The address which was observed in place of the expected one.
    pub fn actual_address(&self) -> usize {
        match *self {
            TaggedCasError::StaleTag { actual_address, .. } => actual_address,
            TaggedCasError::Changed { actual_address, .. } => actual_address,
        }
    }

    /// The tag which was observed in place of the expected one.
    pub fn actual_tag(&self) -> Tag {
        match *self {
            TaggedCasError::StaleTag { actual_tag, .. } => actual_tag,
            TaggedCasError::Changed { actual_tag, .. } => actual_tag,
        }
    }

    /// Whether the CAS was rejected purely on the tag, i.e. the address compared equal. This is
    /// exactly the situation in which an untagged CAS would have suffered from ABA.
    pub fn is_stale_tag(&self) -> bool {
        matches!(self, TaggedCasError::StaleTag { .. })
    }
}
