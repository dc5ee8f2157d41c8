//! Compiled-regex cache for configured patterns.
//!
//! ACL section regexes and provider issuer regexes come from settings and are
//! matched on every request. Each distinct pattern is compiled once per
//! process; invalid patterns are remembered too, so they are only logged once.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use regex::Regex;

/// Distinct patterns kept before new ones are compiled without caching.
const MAX_CACHED_PATTERNS: usize = 512;

static CACHE: LazyLock<RwLock<HashMap<String, Option<Regex>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Get or compile `pattern`; `None` when it is not a valid regex.
pub(crate) fn get_or_compile(pattern: &str) -> Option<Regex> {
    if let Ok(cache) = CACHE.read()
        && let Some(compiled) = cache.get(pattern)
    {
        return compiled.clone();
    }

    let compiled = match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Ignoring invalid regex '{pattern}': {e}");
            None
        }
    };
    if let Ok(mut cache) = CACHE.write()
        && cache.len() < MAX_CACHED_PATTERNS
    {
        cache.insert(pattern.to_string(), compiled.clone());
    }
    compiled
}

#[cfg(test)]
pub(crate) fn is_cached(pattern: &str) -> bool {
    CACHE
        .read()
        .map(|cache| cache.contains_key(pattern))
        .unwrap_or(false)
}
