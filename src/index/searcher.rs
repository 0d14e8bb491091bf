use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, FieldTokens};
use crate::index::tombstones::TombstoneSet;

/// Indexes documents represented as per-field token sets. All data lives in
/// memory; a searcher can be saved to a writer and loaded again.
///
/// Ids are dense and never reused: deletion only sets a tombstone bit, so
/// search results come back in insertion order.
pub struct TokenSetSearcher<D> {
    docs: Vec<D>,
    inverted: HashMap<String, Vec<DocId>>,
    deleted: TombstoneSet,
    deleted_count: usize,
}

impl<D> Default for TokenSetSearcher<D> {
    fn default() -> Self {
        TokenSetSearcher {
            docs: Vec::new(),
            inverted: HashMap::new(),
            deleted: TombstoneSet::new(),
            deleted_count: 0,
        }
    }
}

/// Builds a query over a single field.
pub fn single_field_query<I, S>(field: &str, tokens: I) -> FieldTokens
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut query = HashMap::new();
    query.insert(
        field.to_string(),
        tokens.into_iter().map(Into::into).collect(),
    );
    query
}

fn posting_key(field: &str, token: &str) -> String {
    // field and token are opaque; the colon is the only reserved byte
    format!("{}:{}", field, token)
}

impl<D> TokenSetSearcher<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a document and returns its id.
    pub fn add_doc(&mut self, fields: &FieldTokens, payload: D) -> DocId {
        let doc_id = DocId::new(self.docs.len() as i32);
        self.docs.push(payload);
        for (field, tokens) in fields {
            for token in tokens {
                self.inverted
                    .entry(posting_key(field, token))
                    .or_default()
                    .push(doc_id);
            }
        }
        doc_id
    }

    /// Marks a document as deleted. Deleting an already-deleted id is a no-op.
    pub fn delete(&mut self, doc_id: DocId) -> Result<()> {
        let id = doc_id.value();
        if id < 0 || id as usize >= self.docs.len() {
            return Err(Error::new(
                ErrorKind::InvalidDocId,
                format!("doc id {} outside [0, {})", id, self.docs.len()),
            ));
        }
        if self.deleted.set(id as usize) {
            self.deleted_count += 1;
        }
        Ok(())
    }

    /// Returns the payload of a document, tombstoned or not.
    pub fn doc_info(&self, doc_id: DocId) -> Result<&D> {
        let id = doc_id.value();
        if id < 0 || id as usize >= self.docs.len() {
            return Err(Error::new(
                ErrorKind::InvalidDocId,
                format!("doc id {} outside [0, {})", id, self.docs.len()),
            ));
        }
        Ok(&self.docs[id as usize])
    }

    /// Number of live (non-deleted) documents.
    pub fn doc_count(&self) -> usize {
        self.docs.len() - self.deleted_count
    }

    /// Number of tombstoned documents.
    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    /// Total number of indexed slots, tombstoned ones included.
    pub fn indexed_count(&self) -> usize {
        self.docs.len()
    }

    /// Read-only view of the posting list for `(field, token)`; ids are
    /// strictly ascending and may include tombstoned documents.
    pub fn token_doc_list(&self, field: &str, token: &str) -> &[DocId] {
        self.inverted
            .get(&posting_key(field, token))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outputs every document carrying all queried tokens, in insertion
    /// order. An empty query (or one whose fields all map to empty token
    /// sets) outputs every non-deleted document. If `output` returns an
    /// error the search stops and the error is returned unchanged.
    pub fn search<F>(&self, query: &FieldTokens, mut output: F) -> Result<()>
    where
        F: FnMut(DocId, &D) -> Result<()>,
    {
        let mut keys = HashSet::new();
        for (field, tokens) in query {
            for token in tokens {
                keys.insert(posting_key(field, token));
            }
        }

        if keys.is_empty() {
            for (id, payload) in self.docs.iter().enumerate() {
                if !self.deleted.contains(id) {
                    output(DocId::new(id as i32), payload)?;
                }
            }
            return Ok(());
        }

        if keys.len() == 1 {
            for key in &keys {
                let list = match self.inverted.get(key) {
                    Some(list) => list,
                    None => return Ok(()),
                };
                for &doc_id in list {
                    if !self.deleted.contains(doc_id.value() as usize) {
                        output(doc_id, &self.docs[doc_id.value() as usize])?;
                    }
                }
            }
            return Ok(());
        }

        let mut lists: Vec<&[DocId]> = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.inverted.get(key) {
                // one empty posting list rules out every document
                Some(list) if !list.is_empty() => lists.push(list),
                _ => return Ok(()),
            }
        }
        self.intersect(&lists, &mut output)
    }

    /// Round-robin zig-zag intersection of two or more posting lists,
    /// seeded from the shortest (pivot) list.
    ///
    /// Before each linear scan, a cursor lagging `target` by more than
    /// `gap = 2N / |L|` tries a linear skip estimate, adopted only when it
    /// stays at or below the target, so `L[i][idx[i]] <= target` holds when
    /// the scan begins.
    fn intersect<F>(&self, lists: &[&[DocId]], output: &mut F) -> Result<()>
    where
        F: FnMut(DocId, &D) -> Result<()>,
    {
        let doc_total = self.docs.len() as i64;
        if doc_total == 0 {
            return Ok(());
        }
        let n = lists.len();

        let mut gaps = Vec::with_capacity(n);
        let mut pivot = 0usize;
        for (i, list) in lists.iter().enumerate() {
            gaps.push(2 * doc_total / list.len() as i64);
            if list.len() < lists[pivot].len() {
                pivot = i;
            }
        }
        let pivot_next = if pivot + 1 == n { 0 } else { pivot + 1 };

        // per-list cursors
        let mut heads = vec![0usize; n];
        let mut target = lists[pivot][0];
        let mut matched = 1usize;
        let mut i = pivot_next;
        'mainloop: loop {
            let list = lists[i];

            let behind = target.value() as i64 - list[heads[i]].value() as i64;
            if behind > gaps[i] {
                // estimate the skip linearly; adopt only if it does not
                // overshoot the target
                let skip = (behind * list.len() as i64 / doc_total) as usize;
                let jump = heads[i] + skip;
                if jump < list.len() && list[jump].value() <= target.value() {
                    heads[i] = jump;
                }
            }
            // scan to the first entry at or past the target
            while list[heads[i]].value() < target.value() {
                heads[i] += 1;
                if heads[i] == list.len() {
                    break 'mainloop;
                }
            }
            // step past tombstoned entries
            while self.deleted.contains(list[heads[i]].value() as usize) {
                heads[i] += 1;
                if heads[i] == list.len() {
                    break 'mainloop;
                }
            }

            if list[heads[i]].value() > target.value() {
                // the target cannot match; reseed from the pivot
                heads[pivot] += 1;
                if heads[pivot] == lists[pivot].len() {
                    break;
                }
                target = lists[pivot][heads[pivot]];
                matched = 1;
                i = pivot_next;
            } else {
                matched += 1;
                if matched == n {
                    output(target, &self.docs[target.value() as usize])?;
                    heads[pivot] += 1;
                    if heads[pivot] == lists[pivot].len() {
                        break;
                    }
                    target = lists[pivot][heads[pivot]];
                    matched = 1;
                    i = pivot_next;
                } else {
                    i = if i + 1 == n { 0 } else { i + 1 };
                }
            }
        }
        Ok(())
    }

    /// Serializes the searcher to `writer`: document count, each payload,
    /// posting entry count and `(key, posting)` pairs, the tombstone bytes,
    /// then the deleted count.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()>
    where
        D: Serialize,
    {
        bincode::serialize_into(&mut *writer, &(self.docs.len() as u64))?;
        for payload in &self.docs {
            bincode::serialize_into(&mut *writer, payload)?;
        }
        bincode::serialize_into(&mut *writer, &(self.inverted.len() as u64))?;
        for (key, posting) in &self.inverted {
            bincode::serialize_into(&mut *writer, key)?;
            bincode::serialize_into(&mut *writer, posting)?;
        }
        bincode::serialize_into(&mut *writer, &self.deleted.to_bytes())?;
        bincode::serialize_into(&mut *writer, &(self.deleted_count as u64))?;
        Ok(())
    }

    /// Replaces the searcher's state from `reader`. State after a failed
    /// load is unspecified.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<()>
    where
        D: DeserializeOwned,
    {
        *self = TokenSetSearcher::default();

        let doc_count: u64 = bincode::deserialize_from(&mut *reader)?;
        let mut docs = Vec::with_capacity(doc_count as usize);
        for _ in 0..doc_count {
            docs.push(bincode::deserialize_from(&mut *reader)?);
        }
        let entry_count: u64 = bincode::deserialize_from(&mut *reader)?;
        let mut inverted = HashMap::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let key: String = bincode::deserialize_from(&mut *reader)?;
            let posting: Vec<DocId> = bincode::deserialize_from(&mut *reader)?;
            inverted.insert(key, posting);
        }
        let tombstone_bytes: Vec<u8> = bincode::deserialize_from(&mut *reader)?;
        let deleted_count: u64 = bincode::deserialize_from(&mut *reader)?;

        self.docs = docs;
        self.inverted = inverted;
        self.deleted = TombstoneSet::from_bytes(&tombstone_bytes);
        self.deleted_count = deleted_count as usize;
        Ok(())
    }
}
