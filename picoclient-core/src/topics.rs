//! Topic filter matching
//!
//! Minimal `+`/`#` wildcard helpers for routing received messages. The
//! engines only use [`is_wildcard`] to keep wildcards out of PUBLISH topic
//! names; the matcher itself is an application-side convenience.

use crate::error::{ProtocolError, Result};

/// True if the topic or filter contains a wildcard character.
pub fn is_wildcard(topic: &str) -> bool {
    topic.as_bytes().iter().any(|&b| b == b'#' || b == b'+')
}

/// Validate a topic filter's wildcard placement.
///
/// Wildcards must occupy a whole level ("finance#" is malformed) and "#"
/// must be the final level.
pub fn validate_filter(filter: &str) -> Result<()> {
    let levels = filter.split('/').count();
    for (i, part) in filter.split('/').enumerate() {
        if is_wildcard(part) && part.len() != 1 {
            return Err(ProtocolError::MalformedWildcard.into());
        }
        if part == "#" && i != levels - 1 {
            return Err(ProtocolError::MalformedWildcard.into());
        }
    }
    Ok(())
}

/// Match a topic name against a filter, level by level.
///
/// "+" matches exactly one level, "#" matches the rest of the topic and
/// also the parent level itself, so "finance/stock/ibm/#" matches
/// "finance/stock/ibm".
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_parts = filter.split('/');
    for topic_part in topic.split('/') {
        match filter_parts.next() {
            // topic is longer, no match
            None => return false,
            // everything below this level matches
            Some("#") => return true,
            Some("+") => {}
            Some(part) if part == topic_part => {}
            Some(_) => return false,
        }
    }
    // a single trailing "#" also matches the parent level
    match filter_parts.next() {
        None => true,
        Some("#") => filter_parts.next().is_none(),
        Some(_) => false,
    }
}
