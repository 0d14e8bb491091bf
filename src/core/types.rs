use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Dense document identifier, assigned sequentially from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub i32);

impl DocId {
    pub fn new(id: i32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for DocId {
    fn from(id: i32) -> Self {
        DocId(id)
    }
}

/// Field name → token set. Both indexed documents and queries take this shape.
pub type FieldTokens = HashMap<String, HashSet<String>>;
