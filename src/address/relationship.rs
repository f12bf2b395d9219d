//! # Structural relationship between two addresses.
//!
//! [`Relationship`] is a flag set. The empty set is the wildcard
//! ([`Relationship::ANY`]): a subscriber accepting `ANY` hears every
//! publisher, a publisher publishing to `ANY` reaches every subscriber.
//!
//! Recognition produces exactly one value for an ordered pair of addresses.
//! Only two combined values are ever recognized:
//! `CLOSEST_PARENT | PARENT` and `CLOSEST_CHILD | CHILD`.
//!
//! ```text
//!            root
//!           /    \
//!          a      b           a -> root     : CLOSEST_PARENT | PARENT
//!          |      |           a -> b        : SIBLING
//!          a1     b1          a -> b1       : SIBLING_CHILD
//!          |                  b1 -> a       : OTHER
//!          a2                 root -> a2    : CHILD
//! ```

use bitflags::bitflags;

bitflags! {
    /// Relationship mask: what one address is to another.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Relationship: u8 {
        /// Same address.
        const SAME = 1 << 0;
        /// Shares the direct parent.
        const SIBLING = 1 << 1;
        /// Below a sibling (or deeper in a sibling's branch).
        const SIBLING_CHILD = 1 << 2;
        /// Direct child. Always recognized together with `CHILD`.
        const CLOSEST_CHILD = 1 << 3;
        /// Any descendant.
        const CHILD = 1 << 4;
        /// Direct parent. Always recognized together with `PARENT`.
        const CLOSEST_PARENT = 1 << 5;
        /// Any ancestor.
        const PARENT = 1 << 6;
        /// None of the above.
        const OTHER = 1 << 7;
    }
}

impl Relationship {
    /// Wildcard mask ("All"): matches every relationship.
    pub const ANY: Self = Self::empty();

    /// True for the wildcard mask.
    #[inline]
    pub fn is_any(self) -> bool {
        self.is_empty()
    }

    /// True if a recognized relationship is admitted by this mask.
    ///
    /// The wildcard admits everything; otherwise the two must share a flag.
    #[inline]
    pub fn admits(self, recognized: Relationship) -> bool {
        self.is_any() || self.intersects(recognized)
    }
}

/// Orthogonal facts established while comparing two addresses.
///
/// Recognition fills at most one "kind" (`same`, `parent`, `child`,
/// `sibling`, `sibling_child`); `closest` refines `parent` or `child`.
/// An all-false record means [`Relationship::OTHER`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelationshipFacts {
    pub same: bool,
    pub parent: bool,
    pub child: bool,
    pub closest: bool,
    pub sibling: bool,
    pub sibling_child: bool,
}

impl RelationshipFacts {
    /// Folds the facts into a mask.
    pub fn to_relationship(self) -> Relationship {
        if self.same {
            return Relationship::SAME;
        }
        if self.parent {
            return if self.closest {
                Relationship::CLOSEST_PARENT | Relationship::PARENT
            } else {
                Relationship::PARENT
            };
        }
        if self.child {
            return if self.closest {
                Relationship::CLOSEST_CHILD | Relationship::CHILD
            } else {
                Relationship::CHILD
            };
        }
        if self.sibling {
            return Relationship::SIBLING;
        }
        if self.sibling_child {
            return Relationship::SIBLING_CHILD;
        }
        Relationship::OTHER
    }
}

impl From<RelationshipFacts> for Relationship {
    fn from(facts: RelationshipFacts) -> Self {
        facts.to_relationship()
    }
}
