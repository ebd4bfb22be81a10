//! Ordinary nested mappings.
//!
//! Maps are `BTreeMap`s and lists are `Vec`s, each behind an `Arc`. A write
//! copies the container being changed (a shallow copy: its children are
//! `Arc` clones) and leaves everything else shared.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{MAX_LIST_PADDING, Scalar, Structure};
use crate::path::Segment;

/// A node of a [`Plain`] tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Terminal value
    Leaf(Scalar),
    /// Keyed children
    Map(Arc<BTreeMap<String, Node>>),
    /// Positional children
    List(Arc<Vec<Node>>),
}

impl Node {
    /// Returns the map if this node is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map.as_ref()),
            _ => None,
        }
    }

    /// Returns the list if this node is one.
    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(list) => Some(list.as_slice()),
            _ => None,
        }
    }

    fn list_or_empty(&self) -> Vec<Node> {
        match self {
            Node::List(list) => list.as_ref().clone(),
            _ => Vec::new(),
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Leaf(value)
    }
}

/// The ordinary nested-mapping structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plain;

impl Structure for Plain {
    type Tree = Node;

    const NAME: &'static str = "plain";

    fn empty_map() -> Node {
        Node::Map(Arc::new(BTreeMap::new()))
    }

    fn empty_list() -> Node {
        Node::List(Arc::new(Vec::new()))
    }

    fn leaf(scalar: Scalar) -> Node {
        Node::Leaf(scalar)
    }

    fn scalar(tree: &Node) -> Option<&Scalar> {
        match tree {
            Node::Leaf(scalar) => Some(scalar),
            _ => None,
        }
    }

    fn is_map(tree: &Node) -> bool {
        matches!(tree, Node::Map(_))
    }

    fn is_list(tree: &Node) -> bool {
        matches!(tree, Node::List(_))
    }

    fn len(tree: &Node) -> usize {
        match tree {
            Node::Leaf(_) => 0,
            Node::Map(map) => map.len(),
            Node::List(list) => list.len(),
        }
    }

    fn child<'a>(tree: &'a Node, segment: &Segment) -> Option<&'a Node> {
        match (tree, segment) {
            (Node::Map(map), Segment::Key(key)) => map.get(key),
            (Node::List(list), Segment::Index(index)) => list.get(*index),
            _ => None,
        }
    }

    fn with_child(tree: &Node, segment: &Segment, value: Node) -> Node {
        match (tree, segment) {
            (Node::Map(map), Segment::Key(key)) => {
                let mut map = map.as_ref().clone();
                map.insert(key.clone(), value);
                Node::Map(Arc::new(map))
            }
            (Node::List(list), Segment::Index(index)) => {
                let mut list = list.as_ref().clone();
                if *index < list.len() {
                    list[*index] = value;
                } else if *index - list.len() > MAX_LIST_PADDING {
                    return tree.clone();
                } else {
                    list.resize(*index, Node::Leaf(Scalar::Null));
                    list.push(value);
                }
                Node::List(Arc::new(list))
            }
            (Node::List(list), Segment::Append) => {
                let mut list = list.as_ref().clone();
                list.push(value);
                Node::List(Arc::new(list))
            }
            _ => Self::with_child(&Self::container_for(segment), segment, value),
        }
    }

    fn without_child(tree: &Node, segment: &Segment) -> Node {
        match (tree, segment) {
            (Node::Map(map), Segment::Key(key)) if map.contains_key(key) => {
                let mut map = map.as_ref().clone();
                map.remove(key);
                Node::Map(Arc::new(map))
            }
            (Node::List(_), Segment::Index(index)) => Self::remove_at(tree, *index),
            _ => tree.clone(),
        }
    }

    fn entries(tree: &Node) -> Vec<(Segment, &Node)> {
        match tree {
            Node::Leaf(_) => Vec::new(),
            Node::Map(map) => map
                .iter()
                .map(|(key, child)| (Segment::Key(key.clone()), child))
                .collect(),
            Node::List(list) => list
                .iter()
                .enumerate()
                .map(|(index, child)| (Segment::Index(index), child))
                .collect(),
        }
    }

    fn same(a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Leaf(x), Node::Leaf(y)) => x == y,
            (Node::Map(x), Node::Map(y)) => Arc::ptr_eq(x, y),
            (Node::List(x), Node::List(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    fn push(list: &Node, value: Node) -> Node {
        let mut items = list.list_or_empty();
        items.push(value);
        Node::List(Arc::new(items))
    }

    fn pop(list: &Node) -> Node {
        match list {
            Node::List(items) if !items.is_empty() => {
                let mut items = items.as_ref().clone();
                items.pop();
                Node::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn shift(list: &Node) -> Node {
        Self::remove_at(list, 0)
    }

    fn unshift(list: &Node, value: Node) -> Node {
        Self::insert_at(list, 0, value)
    }

    fn insert_at(list: &Node, index: usize, value: Node) -> Node {
        let mut items = list.list_or_empty();
        if index > items.len() {
            return list.clone();
        }
        items.insert(index, value);
        Node::List(Arc::new(items))
    }

    fn remove_at(list: &Node, index: usize) -> Node {
        match list {
            Node::List(items) if index < items.len() => {
                let mut items = items.as_ref().clone();
                items.remove(index);
                Node::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn swap(list: &Node, a: usize, b: usize) -> Node {
        match list {
            Node::List(items) if a != b && a < items.len() && b < items.len() => {
                let mut items = items.as_ref().clone();
                items.swap(a, b);
                Node::List(Arc::new(items))
            }
            _ => list.clone(),
        }
    }

    fn from_plain(value: &JsonValue) -> Node {
        match value {
            JsonValue::Array(items) => {
                Node::List(Arc::new(items.iter().map(Self::from_plain).collect()))
            }
            JsonValue::Object(map) => Node::Map(Arc::new(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::from_plain(child)))
                    .collect(),
            )),
            scalar => Node::Leaf(Scalar::from_json(scalar).unwrap_or(Scalar::Null)),
        }
    }

    fn to_plain(tree: &Node) -> JsonValue {
        match tree {
            Node::Leaf(scalar) => scalar.to_json(),
            Node::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::to_plain(child)))
                    .collect::<JsonMap<String, JsonValue>>(),
            ),
            Node::List(list) => JsonValue::Array(list.iter().map(Self::to_plain).collect()),
        }
    }
}
