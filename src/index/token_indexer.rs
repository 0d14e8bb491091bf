use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use crate::core::error::Result;

/// Maintains a bidirectional id ↔ token mapping, e.g. for materializing
/// inlinks from outlinks. Both directions are kept sorted and duplicate-free.
#[derive(Debug, Default)]
pub struct TokenIndexer {
    // id -> sorted tokens
    id_tokens: HashMap<String, Vec<String>>,
    // token -> sorted ids
    token_ids: HashMap<String, Vec<String>>,
}

fn remove_sorted(list: &mut Vec<String>, element: &str) {
    if let Ok(i) = list.binary_search_by(|probe| probe.as_str().cmp(element)) {
        list.remove(i);
    }
}

fn insert_sorted(list: &mut Vec<String>, element: &str) {
    if let Err(i) = list.binary_search_by(|probe| probe.as_str().cmp(element)) {
        list.insert(i, element.to_string());
    }
}

impl TokenIndexer {
    pub fn new() -> Self {
        TokenIndexer::default()
    }

    /// Sets the tokens of `id`, replacing whatever was put before.
    ///
    /// The stored and incoming token lists are diffed in one linear merge;
    /// only the ids of tokens that actually changed are patched, so
    /// re-putting a mostly-unchanged set stays cheap.
    pub fn put_tokens(&mut self, id: &str, tokens: &HashSet<String>) {
        let mut new_tokens: Vec<String> = tokens.iter().cloned().collect();
        new_tokens.sort();

        let old_tokens = self.id_tokens.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let mut o = 0;
        let mut n = 0;
        while o < old_tokens.len() || n < new_tokens.len() {
            let order = if o == old_tokens.len() {
                Ordering::Greater
            } else if n == new_tokens.len() {
                Ordering::Less
            } else {
                old_tokens[o].cmp(&new_tokens[n])
            };
            match order {
                Ordering::Less => {
                    // token dropped from id
                    if let Some(ids) = self.token_ids.get_mut(&old_tokens[o]) {
                        remove_sorted(ids, id);
                    }
                    o += 1;
                }
                Ordering::Greater => {
                    // token added to id
                    insert_sorted(self.token_ids.entry(new_tokens[n].clone()).or_default(), id);
                    n += 1;
                }
                Ordering::Equal => {
                    o += 1;
                    n += 1;
                }
            }
        }

        self.id_tokens.insert(id.to_string(), new_tokens);
    }

    /// Sorted ids carrying `token`. Callers must not rely on the slice
    /// surviving a later `put_tokens`.
    pub fn ids_of_token(&self, token: &str) -> &[String] {
        self.token_ids.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted tokens of `id`.
    pub fn tokens_of_id(&self, id: &str) -> &[String] {
        self.id_tokens.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Serializes both mappings to `writer`, id → tokens first.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        bincode::serialize_into(&mut *writer, &self.id_tokens)?;
        bincode::serialize_into(&mut *writer, &self.token_ids)?;
        Ok(())
    }

    /// Replaces the indexer's state from `reader`.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        *self = TokenIndexer::default();
        self.id_tokens = bincode::deserialize_from(&mut *reader)?;
        self.token_ids = bincode::deserialize_from(&mut *reader)?;
        Ok(())
    }
}
