//! Persistent collections from `imbl`.
//!
//! Maps are `imbl::OrdMap`s and lists are `imbl::Vector`s. Writes go through
//! the collections' own path copying, so an update to a large list or map
//! costs `O(log n)` instead of a full shallow copy.
//!
//! Each container sits behind an `Arc` that serves as its identity. `imbl`
//! keeps small vectors inline, where pointer comparison of the collection
//! itself cannot tell a shared copy from an equal one.

use std::sync::Arc;

use imbl::{OrdMap, Vector};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{MAX_LIST_PADDING, Scalar, Structure};
use crate::path::Segment;

/// A node of a [`Persistent`] tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PNode {
    /// Terminal value
    Leaf(Scalar),
    /// Keyed children
    Map(Arc<OrdMap<String, PNode>>),
    /// Positional children
    List(Arc<Vector<PNode>>),
}

impl PNode {
    /// Returns the map if this node is one.
    pub fn as_map(&self) -> Option<&OrdMap<String, PNode>> {
        match self {
            PNode::Map(map) => Some(map.as_ref()),
            _ => None,
        }
    }

    /// Returns the list if this node is one.
    pub fn as_list(&self) -> Option<&Vector<PNode>> {
        match self {
            PNode::List(list) => Some(list.as_ref()),
            _ => None,
        }
    }

    fn list_or_empty(&self) -> Vector<PNode> {
        match self {
            PNode::List(list) => list.as_ref().clone(),
            _ => Vector::new(),
        }
    }
}

impl From<Scalar> for PNode {
    fn from(value: Scalar) -> Self {
        PNode::Leaf(value)
    }
}

/// The persistent-collection structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Persistent;

impl Structure for Persistent {
    type Tree = PNode;

    const NAME: &'static str = "persistent";

    fn empty_map() -> PNode {
        PNode::Map(Arc::new(OrdMap::new()))
    }

    fn empty_list() -> PNode {
        PNode::List(Arc::new(Vector::new()))
    }

    fn leaf(scalar: Scalar) -> PNode {
        PNode::Leaf(scalar)
    }

    fn scalar(tree: &PNode) -> Option<&Scalar> {
        match tree {
            PNode::Leaf(scalar) => Some(scalar),
            _ => None,
        }
    }

    fn is_map(tree: &PNode) -> bool {
        matches!(tree, PNode::Map(_))
    }

    fn is_list(tree: &PNode) -> bool {
        matches!(tree, PNode::List(_))
    }

    fn len(tree: &PNode) -> usize {
        match tree {
            PNode::Leaf(_) => 0,
            PNode::Map(map) => map.len(),
            PNode::List(list) => list.len(),
        }
    }

    fn child<'a>(tree: &'a PNode, segment: &Segment) -> Option<&'a PNode> {
        match (tree, segment) {
            (PNode::Map(map), Segment::Key(key)) => map.get(key.as_str()),
            (PNode::List(list), Segment::Index(index)) => list.get(*index),
            _ => None,
        }
    }

    fn with_child(tree: &PNode, segment: &Segment, value: PNode) -> PNode {
        match (tree, segment) {
            (PNode::Map(map), Segment::Key(key)) => {
                let mut map = map.as_ref().clone();
                map.insert(key.clone(), value);
                PNode::Map(Arc::new(map))
            }
            (PNode::List(list), Segment::Index(index)) => {
                let mut list = list.as_ref().clone();
                if *index < list.len() {
                    list.set(*index, value);
                } else if *index - list.len() > MAX_LIST_PADDING {
                    return tree.clone();
                } else {
                    while list.len() < *index {
                        list.push_back(PNode::Leaf(Scalar::Null));
                    }
                    list.push_back(value);
                }
                PNode::List(Arc::new(list))
            }
            (PNode::List(list), Segment::Append) => {
                let mut list = list.as_ref().clone();
                list.push_back(value);
                PNode::List(Arc::new(list))
            }
            _ => Self::with_child(&Self::container_for(segment), segment, value),
        }
    }

    fn without_child(tree: &PNode, segment: &Segment) -> PNode {
        match (tree, segment) {
            (PNode::Map(map), Segment::Key(key)) if map.contains_key(key.as_str()) => {
                let mut map = map.as_ref().clone();
                map.remove(key.as_str());
                PNode::Map(Arc::new(map))
            }
            (PNode::List(_), Segment::Index(index)) => Self::remove_at(tree, *index),
            _ => tree.clone(),
        }
    }

    fn entries(tree: &PNode) -> Vec<(Segment, &PNode)> {
        match tree {
            PNode::Leaf(_) => Vec::new(),
            PNode::Map(map) => map
                .iter()
                .map(|(key, child)| (Segment::Key(key.clone()), child))
                .collect(),
            PNode::List(list) => list
                .iter()
                .enumerate()
                .map(|(index, child)| (Segment::Index(index), child))
                .collect(),
        }
    }

    fn same(a: &PNode, b: &PNode) -> bool {
        match (a, b) {
            (PNode::Leaf(x), PNode::Leaf(y)) => x == y,
            (PNode::Map(x), PNode::Map(y)) => Arc::ptr_eq(x, y),
            (PNode::List(x), PNode::List(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    fn push(list: &PNode, value: PNode) -> PNode {
        let mut items = list.list_or_empty();
        items.push_back(value);
        PNode::List(Arc::new(items))
    }

    fn pop(list: &PNode) -> PNode {
        match list {
            PNode::List(items) if !items.is_empty() => {
                let mut items = items.as_ref().clone();
                items.pop_back();
                PNode::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn shift(list: &PNode) -> PNode {
        match list {
            PNode::List(items) if !items.is_empty() => {
                let mut items = items.as_ref().clone();
                items.pop_front();
                PNode::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn unshift(list: &PNode, value: PNode) -> PNode {
        let mut items = list.list_or_empty();
        items.push_front(value);
        PNode::List(Arc::new(items))
    }

    fn insert_at(list: &PNode, index: usize, value: PNode) -> PNode {
        let mut items = list.list_or_empty();
        if index > items.len() {
            return list.clone();
        }
        items.insert(index, value);
        PNode::List(Arc::new(items))
    }

    fn remove_at(list: &PNode, index: usize) -> PNode {
        match list {
            PNode::List(items) if index < items.len() => {
                let mut items = items.as_ref().clone();
                items.remove(index);
                PNode::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn swap(list: &PNode, a: usize, b: usize) -> PNode {
        match list {
            PNode::List(items) if a != b && a < items.len() && b < items.len() => {
                let mut items = items.as_ref().clone();
                items.swap(a, b);
                PNode::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn from_plain(value: &JsonValue) -> PNode {
        match value {
            JsonValue::Array(items) => {
                PNode::List(Arc::new(items.iter().map(Self::from_plain).collect()))
            }
            JsonValue::Object(map) => PNode::Map(Arc::new(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::from_plain(child)))
                    .collect(),
            )),
            scalar => PNode::Leaf(Scalar::from_json(scalar).unwrap_or(Scalar::Null)),
        }
    }

    fn to_plain(tree: &PNode) -> JsonValue {
        match tree {
            PNode::Leaf(scalar) => scalar.to_json(),
            PNode::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::to_plain(child)))
                    .collect::<JsonMap<String, JsonValue>>(),
            ),
            PNode::List(list) => JsonValue::Array(list.iter().map(Self::to_plain).collect()),
        }
    }
}
