//! Query arguments map with structural merge semantics
//!
//! `QueryVars` owns an insertion-ordered JSON object. Two keys are special:
//! `meta_query` and `tax_query` always hold an array of condition blocks.
//! A condition block is an object identified by `key` (meta) or `taxonomy`
//! (tax). Groups nest in two shapes: an array that may start with a
//! `{"relation": "OR"}` marker, or an object without the identifying field
//! whose object or array members are the group's children
//! (`{"relation": "OR", "0": {...}, "1": {...}}`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::compare::CompareOp;

pub const META_QUERY: &str = "meta_query";
pub const TAX_QUERY: &str = "tax_query";
pub const POST_TYPE: &str = "post_type";
pub const POST_STATUS: &str = "post_status";

/// Sentinel that widens `post_type`/`post_status` to every value.
pub const ANY: &str = "any";

const META_KEY_FIELD: &str = "key";
const TAX_KEY_FIELD: &str = "taxonomy";

/// One step from a group to a child
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Position inside an array group
    Index(usize),
    /// Member of an object-shaped group
    Field(String),
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(field: &str) -> Self {
        PathSegment::Field(field.to_string())
    }
}

/// Steps from the tree root to a block. Always starts with an index.
pub type BlockPath = Vec<PathSegment>;

/// Result of an upsert into a condition tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Fields were merged into the block at this path
    Merged(BlockPath),
    /// A new block was appended at this top-level index
    Appended(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct QueryVars {
    vars: Map<String, Value>,
}

impl Default for QueryVars {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for QueryVars {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

impl From<QueryVars> for Map<String, Value> {
    fn from(vars: QueryVars) -> Self {
        vars.vars
    }
}

impl QueryVars {
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut vars = Self { vars: map };
        vars.ensure_trees();
        vars
    }

    /// Replace the whole map. The only wholesale replacement path.
    pub fn set_vars(&mut self, map: Map<String, Value>) -> &mut Self {
        self.vars = map;
        self.ensure_trees();
        self
    }

    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.vars
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if is_tree_key(&key) {
            self.vars.insert(key, Value::Array(into_list(value)));
        } else {
            self.vars.insert(key, value);
        }
        self
    }

    /// Remove a key. The condition trees are reset to empty instead.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        if is_tree_key(key) {
            self.vars.insert(key.to_string(), Value::Array(Vec::new()));
        } else {
            self.vars.shift_remove(key);
        }
        self
    }

    pub fn meta_query(&self) -> &[Value] {
        self.tree(META_QUERY)
    }

    pub fn tax_query(&self) -> &[Value] {
        self.tree(TAX_QUERY)
    }

    pub fn add_meta_query(&mut self, block: impl Into<Value>) -> &mut Self {
        self.tree_mut(META_QUERY).push(block.into());
        self
    }

    pub fn add_tax_query(&mut self, block: impl Into<Value>) -> &mut Self {
        self.tree_mut(TAX_QUERY).push(block.into());
        self
    }

    /// Merge every entry of `incoming` via [`QueryVars::merge_var`].
    pub fn merge(&mut self, incoming: Map<String, Value>, allow_empty: bool) -> &mut Self {
        for (key, value) in incoming {
            self.merge_var(&key, value, allow_empty);
        }
        self
    }

    pub fn merge_var(&mut self, key: &str, value: Value, allow_empty: bool) -> &mut Self {
        if !allow_empty && is_empty_value(&value) {
            return self;
        }

        match key {
            POST_TYPE | POST_STATUS => match self.vars.get_mut(key) {
                Some(current) if is_any(current) || is_any(&value) => {
                    *current = Value::String(ANY.to_string());
                }
                Some(current) if !current.is_null() => {
                    let existing = std::mem::take(current);
                    *current = Value::Array(unique_union(into_list(existing), into_list(value)));
                }
                Some(current) => *current = value,
                None => {
                    self.vars.insert(key.to_string(), value);
                }
            },
            META_QUERY | TAX_QUERY => {
                let current = std::mem::take(self.tree_mut(key));
                *self.tree_mut(key) = unique_union(current, into_list(value));
            }
            _ => match self.vars.get_mut(key) {
                Some(Value::Array(current)) if value.is_array() => {
                    let existing = std::mem::take(current);
                    *current = unique_union(existing, into_list(value));
                }
                _ => {
                    self.vars.insert(key.to_string(), value);
                }
            },
        }
        self
    }

    /// Assign every entry without merge logic. An empty map is ignored.
    pub fn overwrite(&mut self, incoming: Map<String, Value>) -> &mut Self {
        for (key, value) in incoming {
            self.set(key, value);
        }
        self
    }

    /// Merge `block` into the first meta block whose `key` satisfies `op`
    /// against the block's own `key`, or append it.
    pub fn upsert_meta_query(&mut self, block: Map<String, Value>, op: CompareOp) -> UpsertOutcome {
        let tree = self.tree_mut(META_QUERY);
        upsert(tree, block, META_KEY_FIELD, op)
    }

    /// Same as [`QueryVars::upsert_meta_query`], keyed on `taxonomy`.
    pub fn upsert_tax_query(&mut self, block: Map<String, Value>, op: CompareOp) -> UpsertOutcome {
        let tree = self.tree_mut(TAX_QUERY);
        upsert(tree, block, TAX_KEY_FIELD, op)
    }

    fn tree(&self, key: &str) -> &[Value] {
        self.vars
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn tree_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let slot = self
            .vars
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            let previous = std::mem::take(slot);
            *slot = Value::Array(into_list(previous));
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("condition tree normalised to an array above"),
        }
    }

    fn ensure_trees(&mut self) {
        self.tree_mut(META_QUERY);
        self.tree_mut(TAX_QUERY);
    }
}

fn upsert(
    tree: &mut Vec<Value>,
    block: Map<String, Value>,
    key_field: &str,
    op: CompareOp,
) -> UpsertOutcome {
    let found = block
        .get(key_field)
        .and_then(|target| find_path(tree, target, key_field, op));

    match found {
        Some(path) => {
            let mut cursor = BlockCursor::new(tree, path);
            cursor.merge(block);
            UpsertOutcome::Merged(cursor.into_path())
        }
        None => {
            tree.push(Value::Object(block));
            UpsertOutcome::Appended(tree.len() - 1)
        }
    }
}

/// Depth-first search for the first block whose `key_field` satisfies
/// `block[key_field] <op> target`.
///
/// Objects carrying `key_field` are blocks and are not descended into.
/// Objects without it are groups; their object and array members are
/// searched in insertion order.
pub fn find_path(
    tree: &[Value],
    target: &Value,
    key_field: &str,
    op: CompareOp,
) -> Option<BlockPath> {
    tree.iter().enumerate().find_map(|(index, node)| {
        prepend(PathSegment::Index(index), search_node(node, target, key_field, op)?)
    })
}

fn search_node(
    node: &Value,
    target: &Value,
    key_field: &str,
    op: CompareOp,
) -> Option<BlockPath> {
    match node {
        Value::Object(block) => match block.get(key_field) {
            Some(field) => op.evaluate(field, target).then(Vec::new),
            None => block.iter().find_map(|(name, child)| {
                if !(child.is_object() || child.is_array()) {
                    return None;
                }
                prepend(
                    PathSegment::Field(name.clone()),
                    search_node(child, target, key_field, op)?,
                )
            }),
        },
        Value::Array(group) => find_path(group, target, key_field, op),
        _ => None,
    }
}

fn prepend(segment: PathSegment, mut rest: BlockPath) -> Option<BlockPath> {
    rest.insert(0, segment);
    Some(rest)
}

fn child<'a>(node: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match segment {
        PathSegment::Index(index) => node.as_array()?.get(*index),
        PathSegment::Field(name) => node.as_object()?.get(name),
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match segment {
        PathSegment::Index(index) => node.as_array_mut()?.get_mut(*index),
        PathSegment::Field(name) => node.as_object_mut()?.get_mut(name),
    }
}

fn node_at_path<'a>(tree: &'a [Value], path: &[PathSegment]) -> Option<&'a Value> {
    let (PathSegment::Index(first), rest) = path.split_first()? else {
        return None;
    };
    rest.iter().try_fold(tree.get(*first)?, |node, segment| child(node, segment))
}

fn node_at_path_mut<'a>(tree: &'a mut [Value], path: &[PathSegment]) -> Option<&'a mut Value> {
    let (PathSegment::Index(first), rest) = path.split_first()? else {
        return None;
    };
    rest.iter()
        .try_fold(tree.get_mut(*first)?, |node, segment| child_mut(node, segment))
}

pub fn block_at_path<'a>(
    tree: &'a [Value],
    path: &[PathSegment],
) -> Option<&'a Map<String, Value>> {
    node_at_path(tree, path)?.as_object()
}

pub fn block_at_path_mut<'a>(
    tree: &'a mut [Value],
    path: &[PathSegment],
) -> Option<&'a mut Map<String, Value>> {
    node_at_path_mut(tree, path)?.as_object_mut()
}

/// A condition tree paired with the path of one block inside it.
///
/// All access goes through explicit `get`/`set`/`merge` calls that resolve
/// the path on demand; a stale path simply reports a miss.
#[derive(Debug)]
pub struct BlockCursor<'a> {
    tree: &'a mut Vec<Value>,
    path: BlockPath,
}

impl<'a> BlockCursor<'a> {
    pub fn new(tree: &'a mut Vec<Value>, path: BlockPath) -> Self {
        Self { tree, path }
    }

    /// Cursor on the first block matching `target`, if any.
    pub fn find(
        tree: &'a mut Vec<Value>,
        target: &Value,
        key_field: &str,
        op: CompareOp,
    ) -> Option<Self> {
        let path = find_path(tree, target, key_field, op)?;
        Some(Self::new(tree, path))
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn into_path(self) -> BlockPath {
        self.path
    }

    pub fn block(&self) -> Option<&Map<String, Value>> {
        block_at_path(self.tree.as_slice(), &self.path)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.block()?.get(field)
    }

    /// Returns false when the path no longer addresses a block.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> bool {
        match block_at_path_mut(self.tree.as_mut_slice(), &self.path) {
            Some(block) => {
                block.insert(field.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Shallow merge: incoming fields replace existing ones.
    pub fn merge(&mut self, fields: Map<String, Value>) -> bool {
        match block_at_path_mut(self.tree.as_mut_slice(), &self.path) {
            Some(block) => {
                for (field, value) in fields {
                    block.insert(field, value);
                }
                true
            }
            None => false,
        }
    }
}

/// null, `false`, `""`, `[]` and `{}` count as empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

fn is_any(value: &Value) -> bool {
    value.as_str() == Some(ANY)
}

fn is_tree_key(key: &str) -> bool {
    key == META_QUERY || key == TAX_QUERY
}

/// Coerce a value to a list: arrays pass through, null is empty, anything
/// else becomes a one-element list.
pub fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// `unique(a ++ b)`, keeping the first occurrence of each value.
pub fn unique_union(a: Vec<Value>, b: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(a.len() + b.len());
    for value in a.into_iter().chain(b) {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
