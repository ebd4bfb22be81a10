//! Pluggable nested-container representations for form trees.
//!
//! Every tree a form keeps (values, initial values, field metadata, error
//! payloads) is a nested structure of maps, lists, and [`Scalar`] leaves.
//! The [`Structure`] trait is the capability set the reducer and the
//! derivations use to read and update those trees; they never touch a
//! representation directly.
//!
//! # Implementations
//!
//! - [`Plain`] - ordinary nested mappings (`Arc<BTreeMap>` and `Arc<Vec>`),
//!   copied one level at a time on write.
//! - [`Persistent`] - persistent collections from `imbl` (requires the
//!   `persistent` feature).
//!
//! # Structural sharing
//!
//! Updates return new trees and never mutate their input. Only the nodes on
//! the path from the root to the updated position are replaced; every other
//! subtree of the result is the same allocation as before, which
//! [`Structure::same`] observes. Leaves compare by value, the way primitive
//! values do.
//!
//! ```
//! use formstate::structure::{Plain, Structure};
//! use formstate::path::FieldPath;
//! use serde_json::json;
//!
//! let tree = Plain::from_plain(&json!({"a": {"x": 1}, "b": {"y": 2}}));
//! let path = FieldPath::parse("a.x")?;
//! let updated = Plain::set_in(&tree, path.segments(), Plain::from_plain(&json!(5)));
//!
//! let b = FieldPath::parse("b")?;
//! assert!(Plain::same(
//!     Plain::get_in(&tree, b.segments()).unwrap(),
//!     Plain::get_in(&updated, b.segments()).unwrap(),
//! ));
//! # Ok::<(), formstate::path::PathError>(())
//! ```

use std::fmt;

use serde_json::Value as JsonValue;

use crate::path::Segment;

#[cfg(feature = "persistent")]
pub mod persistent;
pub mod plain;
pub mod scalar;

#[cfg(feature = "persistent")]
pub use persistent::{PNode, Persistent};
pub use plain::{Node, Plain};
pub use scalar::Scalar;

/// Most `null` slots a single write may add to reach a list index.
///
/// Writes further past the end of a list leave the tree unchanged.
pub const MAX_LIST_PADDING: usize = 10_000;

/// Capability set over one nested-container representation.
///
/// Implementors provide the single-level primitives; the path-based
/// algorithms (`get_in`, `set_in`, `delete_in`, `deep_equals`, ...) are
/// provided on top of them and behave identically for every representation.
pub trait Structure: fmt::Debug + Send + Sync + 'static {
    /// A node of a tree: a scalar leaf, a map, or a list.
    type Tree: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// Human readable name, used in logs.
    const NAME: &'static str;

    /// A new map node with no children.
    fn empty_map() -> Self::Tree;

    /// A new list node with no elements.
    fn empty_list() -> Self::Tree;

    /// Wraps a scalar as a leaf node.
    fn leaf(scalar: Scalar) -> Self::Tree;

    /// Returns the scalar if `tree` is a leaf.
    fn scalar(tree: &Self::Tree) -> Option<&Scalar>;

    /// Returns true if `tree` is a map node.
    fn is_map(tree: &Self::Tree) -> bool;

    /// Returns true if `tree` is a list node.
    fn is_list(tree: &Self::Tree) -> bool;

    /// Number of direct children; zero for leaves.
    fn len(tree: &Self::Tree) -> usize;

    /// The direct child addressed by `segment`.
    ///
    /// Keys only address maps and indices only address lists. `Append`
    /// never addresses an existing child.
    fn child<'a>(tree: &'a Self::Tree, segment: &Segment) -> Option<&'a Self::Tree>;

    /// Returns a copy of `tree` with the child at `segment` replaced.
    ///
    /// Setting an index past the end of a list pads the gap with `null`,
    /// up to [`MAX_LIST_PADDING`] slots; `Append` pushes. If `tree` is not the kind of container `segment`
    /// addresses, a fresh container of the right kind is used instead.
    fn with_child(tree: &Self::Tree, segment: &Segment, value: Self::Tree) -> Self::Tree;

    /// Returns a copy of `tree` without the child at `segment`.
    ///
    /// Removing a list index splices it out, shifting later elements down.
    fn without_child(tree: &Self::Tree, segment: &Segment) -> Self::Tree;

    /// Direct children in order: sorted keys for maps, indices for lists.
    fn entries(tree: &Self::Tree) -> Vec<(Segment, &Self::Tree)>;

    /// Identity comparison: same allocation for containers, equal value for leaves.
    fn same(a: &Self::Tree, b: &Self::Tree) -> bool;

    /// Appends `value` to a list.
    fn push(list: &Self::Tree, value: Self::Tree) -> Self::Tree;

    /// Removes the last element of a list.
    fn pop(list: &Self::Tree) -> Self::Tree;

    /// Removes the first element of a list.
    fn shift(list: &Self::Tree) -> Self::Tree;

    /// Prepends `value` to a list.
    fn unshift(list: &Self::Tree, value: Self::Tree) -> Self::Tree;

    /// Inserts `value` before `index`. `index == len` appends.
    fn insert_at(list: &Self::Tree, index: usize, value: Self::Tree) -> Self::Tree;

    /// Removes the element at `index`.
    fn remove_at(list: &Self::Tree, index: usize) -> Self::Tree;

    /// Exchanges the elements at `a` and `b`.
    fn swap(list: &Self::Tree, a: usize, b: usize) -> Self::Tree;

    /// Builds a tree from its plain JSON form.
    fn from_plain(value: &JsonValue) -> Self::Tree;

    /// Renders a tree as plain JSON.
    fn to_plain(tree: &Self::Tree) -> JsonValue;

    /// Returns true for maps and lists.
    fn is_container(tree: &Self::Tree) -> bool {
        Self::is_map(tree) || Self::is_list(tree)
    }

    /// Returns true for containers with no children.
    fn is_empty(tree: &Self::Tree) -> bool {
        Self::is_container(tree) && Self::len(tree) == 0
    }

    /// A fresh container of the kind `segment` addresses.
    fn container_for(segment: &Segment) -> Self::Tree {
        if segment.is_positional() {
            Self::empty_list()
        } else {
            Self::empty_map()
        }
    }

    /// Returns true if `segment` can address a child of `tree` as it is.
    fn accepts(tree: &Self::Tree, segment: &Segment) -> bool {
        if segment.is_positional() {
            Self::is_list(tree)
        } else {
            Self::is_map(tree)
        }
    }

    /// Returns true if writing at `path` pads no list by more than
    /// [`MAX_LIST_PADDING`] slots.
    fn within_padding(tree: &Self::Tree, path: &[Segment]) -> bool {
        let mut node = Some(tree);
        for segment in path {
            if let Segment::Index(index) = segment {
                let len = node.filter(|node| Self::is_list(node)).map_or(0, Self::len);
                if index.saturating_sub(len) > MAX_LIST_PADDING {
                    return false;
                }
            }
            node = node.and_then(|node| Self::child(node, segment));
        }
        true
    }

    /// Looks up the node at `path`.
    fn get_in<'a>(tree: &'a Self::Tree, path: &[Segment]) -> Option<&'a Self::Tree> {
        path.iter()
            .try_fold(tree, |node, segment| Self::child(node, segment))
    }

    /// Returns a tree with `value` stored at `path`.
    ///
    /// Missing intermediate nodes are created: a list when the segment that
    /// addresses into them is an index, a map otherwise. Storing a value
    /// identical to the one already present returns `tree` itself.
    fn set_in(tree: &Self::Tree, path: &[Segment], value: Self::Tree) -> Self::Tree {
        let Some((first, rest)) = path.split_first() else {
            return value;
        };
        if !Self::within_padding(tree, path) {
            return tree.clone();
        }

        let container = if Self::accepts(tree, first) {
            tree.clone()
        } else {
            Self::container_for(first)
        };
        let existing = Self::child(&container, first);

        if rest.is_empty() {
            if let Some(existing) = existing {
                if Self::same(existing, &value) {
                    return container;
                }
            }
            return Self::with_child(&container, first, value);
        }

        let next = match existing {
            Some(child) => {
                let next = Self::set_in(child, rest, value);
                if Self::same(child, &next) {
                    return container;
                }
                next
            }
            None => Self::set_in(&Self::container_for(&rest[0]), rest, value),
        };
        Self::with_child(&container, first, next)
    }

    /// Returns a tree without the node at `path`.
    ///
    /// Only the addressed node is removed; emptied ancestors are left in
    /// place. A missing path returns `tree` itself.
    fn delete_in(tree: &Self::Tree, path: &[Segment]) -> Self::Tree {
        let Some((first, rest)) = path.split_first() else {
            return tree.clone();
        };
        let Some(child) = Self::child(tree, first) else {
            return tree.clone();
        };
        if rest.is_empty() {
            return Self::without_child(tree, first);
        }
        let next = Self::delete_in(child, rest);
        if Self::same(child, &next) {
            tree.clone()
        } else {
            Self::with_child(tree, first, next)
        }
    }

    /// Returns true if `tree` holds nothing but blank values.
    ///
    /// Absent nodes, `null`, `""`, and containers of blank values are blank.
    fn is_blank(tree: Option<&Self::Tree>) -> bool {
        match tree {
            None => true,
            Some(node) => match Self::scalar(node) {
                Some(scalar) => scalar.is_blank(),
                None => Self::entries(node)
                    .into_iter()
                    .all(|(_, child)| Self::is_blank(Some(child))),
            },
        }
    }

    /// Structural equality, used for dirty/pristine.
    ///
    /// Blank values are interchangeable, so a field holding `""` equals a
    /// field that was never set. Maps compare over the union of their keys
    /// and lists over the longer length, with missing children treated as
    /// absent.
    fn deep_equals(a: Option<&Self::Tree>, b: Option<&Self::Tree>) -> bool {
        if let (Some(x), Some(y)) = (a, b) {
            if Self::same(x, y) {
                return true;
            }
        }
        if Self::is_blank(a) && Self::is_blank(b) {
            return true;
        }
        let (Some(x), Some(y)) = (a, b) else {
            return false;
        };

        match (Self::scalar(x), Self::scalar(y)) {
            (Some(p), Some(q)) => p == q,
            (None, None) => {
                if Self::is_map(x) != Self::is_map(y) {
                    return false;
                }
                let left = Self::entries(x);
                let right = Self::entries(y);
                left.iter()
                    .all(|(segment, child)| {
                        Self::deep_equals(Some(child), Self::child(y, segment))
                    })
                    && right.iter().all(|(segment, child)| {
                        Self::child(x, segment).is_some() || Self::is_blank(Some(child))
                    })
            }
            _ => false,
        }
    }

    /// Returns true if an error tree carries at least one non-blank error.
    fn has_errors(tree: &Self::Tree) -> bool {
        !Self::is_blank(Some(tree))
    }

    /// Every leaf under `tree`, with the segments leading to it.
    fn leaf_paths(tree: &Self::Tree) -> Vec<(Vec<Segment>, &Self::Tree)> {
        fn walk<'a, S: Structure + ?Sized>(
            node: &'a S::Tree,
            prefix: &mut Vec<Segment>,
            out: &mut Vec<(Vec<Segment>, &'a S::Tree)>,
        ) {
            if S::scalar(node).is_some() {
                out.push((prefix.clone(), node));
                return;
            }
            for (segment, child) in S::entries(node) {
                prefix.push(segment);
                walk::<S>(child, prefix, out);
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk::<Self>(tree, &mut Vec::new(), &mut out);
        out
    }
}
