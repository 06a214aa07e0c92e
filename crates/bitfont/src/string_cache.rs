//! Per-font cache of composed line commands.
//!
//! Each distinct literal line (markup included) maps to the command composed
//! for it, the time it was last drawn and its measured width. Position is not
//! part of the key. Entries untouched for `max_age` time units are removed by
//! [`StringCache::sweep`]; the registry decides when sweeps run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::command::{CommandId, DrawCommand};
use crate::logging::targets;

/// Counters for one font's string cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringCacheStats {
    /// Draws that reused a cached command.
    pub hits: u64,
    /// Draws that had to compose a new command.
    pub misses: u64,
    /// Entries removed by sweeps.
    pub evictions: u64,
    /// Entries currently cached.
    pub entries: usize,
}

impl StringCacheStats {
    /// Fraction of draws served from the cache, 0.0 when nothing was drawn.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CachedString {
    command: Arc<DrawCommand>,
    last_used: f64,
    width: f32,
}

#[derive(Debug, Default)]
pub struct StringCache {
    entries: HashMap<Box<[u8]>, CachedString>,
    stats: StringCacheStats,
}

impl StringCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the command for `line`, composing and inserting it on a miss.
    /// Either way the entry's timestamp becomes `now`.
    pub fn fetch(
        &mut self,
        line: &[u8],
        now: f64,
        compose: impl FnOnce() -> (DrawCommand, f32),
    ) -> Arc<DrawCommand> {
        if let Some(entry) = self.entries.get_mut(line) {
            entry.last_used = now;
            self.stats.hits += 1;
            return Arc::clone(&entry.command);
        }

        let (command, width) = compose();
        let command = Arc::new(command);
        trace!(
            target: targets::CACHE,
            id = command.id().value(),
            len = line.len(),
            "cached line command"
        );
        self.entries.insert(
            line.into(),
            CachedString {
                command: Arc::clone(&command),
                last_used: now,
                width,
            },
        );
        self.stats.misses += 1;
        command
    }

    /// Cached width of `line`, if it has been drawn.
    pub fn width(&self, line: &[u8]) -> Option<f32> {
        self.entries.get(line).map(|e| e.width)
    }

    /// When `line` was last drawn.
    pub fn last_used(&self, line: &[u8]) -> Option<f64> {
        self.entries.get(line).map(|e| e.last_used)
    }

    /// The cached command for `line` without touching it.
    pub fn peek(&self, line: &[u8]) -> Option<&Arc<DrawCommand>> {
        self.entries.get(line).map(|e| &e.command)
    }

    /// Remove entries with `now - last_used >= max_age`. Returns the ids of
    /// the released commands.
    pub fn sweep(&mut self, now: f64, max_age: f64) -> Vec<CommandId> {
        let mut released = Vec::new();
        self.entries.retain(|_, entry| {
            let keep = now - entry.last_used < max_age;
            if !keep {
                released.push(entry.command.id());
            }
            keep
        });
        self.stats.evictions += released.len() as u64;
        released
    }

    /// Drop every entry. Returns the ids of the released commands.
    pub fn clear(&mut self) -> Vec<CommandId> {
        self.entries.drain().map(|(_, e)| e.command.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StringCacheStats {
        StringCacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }
}
