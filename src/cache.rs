// ABOUTME: Parsed-program cache: source text to immutable AST, filled once under an exclusive section

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ast::Block;
use crate::error::Error;
use crate::value;

/// Shared across every fork of a common ancestor. Entries are append-only
/// and never mutated after insert, so readers need no further coordination.
#[derive(Default)]
pub struct AstCache {
    cache: RwLock<HashMap<String, Arc<Block>>>,
}

impl AstCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tree for `source`, or parse and insert it. The miss
    /// path re-checks under the write lock so a racing fill parses only once.
    pub fn get_or_parse(
        &self,
        source: &str,
        parse: impl FnOnce() -> Result<Block, Error>,
    ) -> Result<Arc<Block>, Error> {
        if let Some(hit) = value::read(&self.cache).get(source) {
            return Ok(Arc::clone(hit));
        }
        let mut cache = value::write(&self.cache);
        if let Some(hit) = cache.get(source) {
            return Ok(Arc::clone(hit));
        }
        let parsed = Arc::new(parse()?);
        cache.insert(source.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_tree() {
        let cache = AstCache::new();
        let a = cache
            .get_or_parse("x", || Ok(Block { stmts: vec![] }))
            .unwrap();
        let b = cache
            .get_or_parse("x", || panic!("must not reparse"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_parse_error_not_cached() {
        let cache = AstCache::new();
        assert!(cache
            .get_or_parse("bad", || Err(Error::Parse("boom".into())))
            .is_err());
        // a later successful parse still fills the entry
        assert!(cache
            .get_or_parse("bad", || Ok(Block { stmts: vec![] }))
            .is_ok());
    }
}
