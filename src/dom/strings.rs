//! String Interning Pool
//!
//! Deduplicated storage for element names, prefixes, namespace URIs,
//! attribute values and text content. Every string lives once in a
//! single UTF-8 buffer and is addressed by a `u32` ID.
//!
//! ID 0 is reserved for the empty string, so "no name" and "" share it.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
///
/// Memory layout:
/// - `spans`: (offset, length) into `data` for each string ID
/// - `data`: concatenated string bytes
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
#[derive(Debug)]
pub struct StringPool {
    /// (offset, len) indexed by string ID
    spans: Vec<(u32, u32)>,
    /// Concatenated UTF-8 data
    data: String,
    /// Hash of string content -> list of IDs with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            spans: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for "no string"
        pool.spans.push((0, 0));
        pool
    }

    /// Compute hash of a string
    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get_str(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.spans.len() as u32;
        self.spans.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Get a string by ID
    pub fn get_str(&self, id: u32) -> Option<&str> {
        let &(offset, len) = self.spans.get(id as usize)?;
        let start = offset as usize;
        self.data.get(start..start + len as usize)
    }

    /// Get a string by ID, falling back to "" for unknown IDs
    #[inline]
    pub fn resolve(&self, id: u32) -> &str {
        self.get_str(id).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern() {
        let mut pool = StringPool::new();
        let id = pool.intern("hello");
        assert!(id > 0);
        assert_eq!(pool.get_str(id), Some("hello"));
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("hello");
        assert_eq!(id1, id2);
        assert_eq!(pool.data, "hello");
    }

    #[test]
    fn test_intern_different() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("world");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get_str(0), Some(""));
        assert_eq!(pool.spans.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let mut pool = StringPool::new();
        let id = pool.intern("urn:a");
        assert_eq!(pool.resolve(id), "urn:a");
        assert_eq!(pool.get_str(999), None);
        assert_eq!(pool.resolve(999), "");
    }
}
