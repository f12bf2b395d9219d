//! # Communicator address: a participant's path in the tree.
//!
//! An address is built once per communicator by walking its parent chain.
//! Each level contributes one segment (the communicator id), root first:
//!
//! ```text
//! root ── view ── button
//!
//! address(button) = "<root>@<view>@<button>"
//! ```
//!
//! ## Rules
//! - An address is never empty.
//! - The rendered string is recomputed on every mutation of the segments.
//! - Relationship queries never mutate either address.

use std::fmt;

use crate::address::communicator::{Communicator, CommunicatorId};
use crate::address::relationship::{Relationship, RelationshipFacts};
use crate::error::EventError;

/// Separator between rendered segments.
pub const SEGMENT_SEPARATOR: &str = "@";

/// Path of a communicator from the root of its tree down to itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommunicatorAddress {
    segments: Vec<String>,
    rendered: String,
}

impl CommunicatorAddress {
    /// Builds the address of `communicator` by walking its parent chain.
    ///
    /// # Errors
    /// - [`EventError::EmptyCommunicatorId`] if any id in the chain is nil;
    /// - [`EventError::AddressCycle`] if the chain revisits a communicator.
    pub fn new(communicator: &dyn Communicator) -> Result<Self, EventError> {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(communicator);

        while let Some(node) = current {
            let id = node.communicator_id();
            if id.is_nil() {
                return Err(EventError::EmptyCommunicatorId);
            }
            let segment = id.segment();
            if segments.contains(&segment) {
                return Err(EventError::AddressCycle { segment });
            }
            segments.push(segment);
            current = node.parent_communicator();
        }

        segments.reverse();
        Ok(Self::from_segments(segments))
    }

    /// Builds an address from ids ordered root first.
    ///
    /// # Errors
    /// [`EventError::EmptyCommunicatorId`] if `ids` is empty or holds a nil id.
    pub fn from_ids(ids: &[CommunicatorId]) -> Result<Self, EventError> {
        if ids.is_empty() || ids.iter().any(CommunicatorId::is_nil) {
            return Err(EventError::EmptyCommunicatorId);
        }
        Ok(Self::from_segments(ids.iter().map(CommunicatorId::segment).collect()))
    }

    fn from_segments(segments: Vec<String>) -> Self {
        let mut address = Self {
            segments,
            rendered: String::new(),
        };
        address.render();
        address
    }

    /// Rendered path, segments joined with [`SEGMENT_SEPARATOR`].
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Path segments, root first.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (depth of the communicator, root = 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if a segment can be removed without emptying the path.
    #[inline]
    pub fn can_remove_last(&self) -> bool {
        self.segments.len() >= 2
    }

    /// Drops the last segment.
    ///
    /// # Errors
    /// [`EventError::SoleSegment`] when only the root segment remains.
    pub fn remove_last(&mut self) -> Result<&mut Self, EventError> {
        if !self.can_remove_last() {
            return Err(EventError::SoleSegment {
                address: self.rendered.clone(),
            });
        }
        self.segments.pop();
        self.render();
        Ok(self)
    }

    /// Drops the last segment unless it is the only one.
    pub fn remove_last_or_nothing(&mut self) -> &mut Self {
        if self.can_remove_last() {
            self.segments.pop();
            self.render();
        }
        self
    }

    /// Address of the direct parent, or a copy of `self` for a root.
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.remove_last_or_nothing();
        parent
    }

    /// What `other` is to `self`.
    ///
    /// # Example
    /// ```
    /// use commbus::{CommunicatorAddress, CommunicatorId, Relationship};
    ///
    /// let (root, child) = (CommunicatorId::new(), CommunicatorId::new());
    /// let root_addr = CommunicatorAddress::from_ids(&[root]).unwrap();
    /// let child_addr = CommunicatorAddress::from_ids(&[root, child]).unwrap();
    ///
    /// assert_eq!(
    ///     root_addr.recognize_relationship(&child_addr),
    ///     Relationship::CLOSEST_CHILD | Relationship::CHILD,
    /// );
    /// ```
    pub fn recognize_relationship(&self, other: &CommunicatorAddress) -> Relationship {
        self.relationship_facts(other).to_relationship()
    }

    /// Relationship of `other` to `self` as separate facts.
    ///
    /// Tests run in precedence order and stop at the first match: same,
    /// closest parent, parent, closest child, child, sibling, sibling child.
    pub fn relationship_facts(&self, other: &CommunicatorAddress) -> RelationshipFacts {
        let mut facts = RelationshipFacts::default();
        let this_up = self.parent_str();
        let other_up = other.parent_str();

        if self.rendered == other.rendered {
            facts.same = true;
        } else if other.rendered == this_up {
            facts.parent = true;
            facts.closest = true;
        } else if is_path_prefix(&other.rendered, &self.rendered) {
            facts.parent = true;
        } else if self.rendered == other_up {
            facts.child = true;
            facts.closest = true;
        } else if is_path_prefix(&self.rendered, &other.rendered) {
            facts.child = true;
        } else if self.can_remove_last() && other.can_remove_last() && this_up == other_up {
            facts.sibling = true;
        } else if is_path_prefix(this_up, &other.rendered) {
            facts.sibling_child = true;
        }
        facts
    }

    /// Rendered parent path without allocating; the whole path for a root.
    fn parent_str(&self) -> &str {
        match self.segments.last() {
            Some(last) if self.can_remove_last() => {
                &self.rendered[..self.rendered.len() - last.len() - SEGMENT_SEPARATOR.len()]
            }
            _ => &self.rendered,
        }
    }

    fn render(&mut self) {
        self.rendered = self.segments.join(SEGMENT_SEPARATOR);
    }
}

/// True if `prefix` is a strict ancestor path of `path`.
fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path[prefix.len()..].starts_with(SEGMENT_SEPARATOR)
}

impl fmt::Display for CommunicatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for CommunicatorAddress {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::EventRegistry;

    struct Node {
        id: CommunicatorId,
        parent: Option<Arc<Node>>,
    }

    impl Communicator for Node {
        fn communicator_id(&self) -> CommunicatorId {
            self.id
        }

        fn parent_communicator(&self) -> Option<&dyn Communicator> {
            self.parent.as_deref().map(|p| p as &dyn Communicator)
        }

        fn set_event_registry(&self, _registry: EventRegistry) {}
    }

    struct Looped {
        id: CommunicatorId,
    }

    impl Communicator for Looped {
        fn communicator_id(&self) -> CommunicatorId {
            self.id
        }

        fn parent_communicator(&self) -> Option<&dyn Communicator> {
            Some(self as &dyn Communicator)
        }

        fn set_event_registry(&self, _registry: EventRegistry) {}
    }

    fn root() -> Arc<Node> {
        Arc::new(Node { id: CommunicatorId::new(), parent: None })
    }

    fn child(parent: &Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            id: CommunicatorId::new(),
            parent: Some(Arc::clone(parent)),
        })
    }

    fn addr(node: &Node) -> CommunicatorAddress {
        CommunicatorAddress::new(node).unwrap()
    }

    #[test]
    fn test_address_walks_root_to_leaf() {
        let r = root();
        let c = child(&r);
        let a = addr(&c);

        assert_eq!(a.len(), 2);
        assert_eq!(a.segments()[0], r.id.segment());
        assert_eq!(a.segments()[1], c.id.segment());
        assert_eq!(a.as_str(), format!("{}@{}", r.id.segment(), c.id.segment()));
        assert_eq!(a.to_string(), a.as_str());
    }

    #[test]
    fn test_nil_id_rejected() {
        let node = Node { id: CommunicatorId::nil(), parent: None };
        assert_eq!(CommunicatorAddress::new(&node), Err(EventError::EmptyCommunicatorId));

        let orphan = Node { id: CommunicatorId::new(), parent: Some(Arc::new(node)) };
        assert_eq!(CommunicatorAddress::new(&orphan), Err(EventError::EmptyCommunicatorId));
    }

    #[test]
    fn test_cycle_rejected() {
        let looped = Looped { id: CommunicatorId::new() };
        let err = CommunicatorAddress::new(&looped).unwrap_err();
        assert!(matches!(err, EventError::AddressCycle { .. }));
        assert!(err.is_address_error());
    }

    #[test]
    fn test_from_ids_rejects_empty() {
        assert!(CommunicatorAddress::from_ids(&[]).is_err());
        assert!(CommunicatorAddress::from_ids(&[CommunicatorId::new(), CommunicatorId::nil()]).is_err());
    }

    #[test]
    fn test_remove_last_or_nothing_on_root() {
        let mut a = addr(&root());
        let before = a.clone();
        a.remove_last_or_nothing();
        assert_eq!(a.len(), 1);
        assert_eq!(a, before);
    }

    #[test]
    fn test_remove_last_or_nothing_on_child() {
        let r = root();
        let mut a = addr(&child(&r));
        a.remove_last_or_nothing();
        assert_eq!(a.len(), 1);
        assert_eq!(a, addr(&r));
    }

    #[test]
    fn test_remove_last_fails_on_root() {
        let mut a = addr(&root());
        let err = a.remove_last().unwrap_err();
        assert!(matches!(err, EventError::SoleSegment { .. }));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_remove_last_shortens_rendering() {
        let r = root();
        let mut a = addr(&child(&r));
        let before = a.as_str().to_string();
        a.remove_last().unwrap();
        assert_ne!(a.as_str(), before);
        assert!(a.as_str().len() < before.len());
    }

    #[test]
    fn test_clone_is_independent() {
        let r = root();
        let original = addr(&child(&r));
        let mut copy = original.clone();
        copy.remove_last().unwrap();
        assert_eq!(original.len(), 2);
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_same() {
        let a = addr(&root());
        assert_eq!(a.recognize_relationship(&a), Relationship::SAME);
        assert_eq!(a.recognize_relationship(&a.clone()), Relationship::SAME);
    }

    #[test]
    fn test_unrelated_roots() {
        let a = addr(&root());
        let b = addr(&root());
        assert_eq!(a.recognize_relationship(&b), Relationship::OTHER);
        assert_eq!(b.recognize_relationship(&a), Relationship::OTHER);
    }

    #[test]
    fn test_parent_and_closest_child() {
        let r = root();
        let p = addr(&r);
        let c = addr(&child(&r));
        assert_eq!(
            p.recognize_relationship(&c),
            Relationship::CLOSEST_CHILD | Relationship::CHILD
        );
        assert_eq!(
            c.recognize_relationship(&p),
            Relationship::CLOSEST_PARENT | Relationship::PARENT
        );
    }

    #[test]
    fn test_grandparent_is_not_closest() {
        let g = root();
        let c1 = child(&g);
        let c2 = child(&c1);
        assert_eq!(addr(&g).recognize_relationship(&addr(&c2)), Relationship::CHILD);
        assert_eq!(addr(&c2).recognize_relationship(&addr(&g)), Relationship::PARENT);
    }

    #[test]
    fn test_siblings() {
        let r = root();
        let a = addr(&child(&r));
        let b = addr(&child(&r));
        assert_eq!(a.recognize_relationship(&b), Relationship::SIBLING);
        assert_eq!(b.recognize_relationship(&a), Relationship::SIBLING);
    }

    #[test]
    fn test_sibling_child_is_asymmetric() {
        let r = root();
        let s1 = child(&r);
        let s2 = child(&r);
        let s2_child = child(&s2);
        let s2_grandchild = child(&s2_child);

        let s1 = addr(&s1);
        for nephew in [addr(&s2_child), addr(&s2_grandchild)] {
            assert_eq!(s1.recognize_relationship(&nephew), Relationship::SIBLING_CHILD);
            assert_eq!(nephew.recognize_relationship(&s1), Relationship::OTHER);
        }
    }

    #[test]
    fn test_same_branch_deeper_levels() {
        let r = root();
        let c1 = child(&r);
        let _c2 = child(&r);
        let c1_child = child(&c1);
        let c1_grandchild = child(&c1_child);

        let c1 = addr(&c1);
        assert_eq!(
            c1.recognize_relationship(&addr(&c1_child)),
            Relationship::CLOSEST_CHILD | Relationship::CHILD
        );
        assert_eq!(c1.recognize_relationship(&addr(&c1_grandchild)), Relationship::CHILD);
        assert_eq!(addr(&c1_grandchild).recognize_relationship(&c1), Relationship::PARENT);
    }

    #[test]
    fn test_disjoint_subtrees() {
        let r1 = root();
        let r2 = root();
        let a = child(&r1);
        let a_child = child(&a);
        let b = child(&r2);
        let b_child = child(&b);
        let b_grandchild = child(&b_child);

        let pairs = [
            (addr(&a), addr(&b_child)),
            (addr(&a), addr(&b_grandchild)),
            (addr(&a_child), addr(&b_grandchild)),
        ];
        for (x, y) in pairs {
            assert_eq!(x.recognize_relationship(&y), Relationship::OTHER);
            assert_eq!(y.recognize_relationship(&x), Relationship::OTHER);
        }
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let r = root();
        let a = addr(&child(&r));
        let b = addr(&child(&r));
        let (a0, b0) = (a.clone(), b.clone());
        let _ = a.recognize_relationship(&b);
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn test_facts_match_mask() {
        let r = root();
        let c = addr(&child(&r));
        let facts = c.relationship_facts(&addr(&r));
        assert!(facts.parent && facts.closest);
        assert!(!facts.child && !facts.same);
    }
}
