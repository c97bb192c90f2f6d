use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use crate::engine::runtime::{Error, StaticContext};
use crate::query::{CompiledQuery, compile};

/// Compiled queries keyed by expression text, least recently used evicted
/// first. All entries are compiled against the cache's static context.
pub struct QueryCache {
    entries: LruCache<String, Arc<CompiledQuery>>,
    static_ctx: StaticContext,
}

impl QueryCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize, static_ctx: StaticContext) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            static_ctx,
        }
    }

    /// Cached query for `text`, compiling it on a miss. Failed compiles are
    /// not cached.
    pub fn get_or_compile(&mut self, text: &str) -> Result<Arc<CompiledQuery>, Error> {
        if let Some(q) = self.entries.get(text) {
            debug!(query = text, "query cache hit");
            return Ok(Arc::clone(q));
        }
        debug!(query = text, "query cache miss");
        let compiled = Arc::new(compile(text, &self.static_ctx)?);
        if let Some((evicted, _)) = self.entries.push(text.to_string(), Arc::clone(&compiled)) {
            if evicted != text {
                debug!(query = %evicted, "query cache eviction");
            }
        }
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_ctx
    }
}
