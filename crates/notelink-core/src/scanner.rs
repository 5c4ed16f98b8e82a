//! Forward-link scanning
//!
//! Links are recognised purely by URI shape, `<scheme>://note/<library>/<key>/`.
//! Whether the target still exists is answered separately by the line store.

use std::ops::Range;

use regex::Regex;

use crate::models::{NoteId, NoteKey};
use crate::store::{LineStore, StoreResult};

/// Scheme used by note links unless configured otherwise
pub const DEFAULT_SCHEME: &str = "zotero";

/// One link occurrence inside a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch<'a> {
    /// The full URI as written
    pub uri: &'a str,
    /// Byte range of the URI within the line
    pub range: Range<usize>,
    /// Target key parsed from the URI
    pub key: NoteKey,
}

/// Extracts forward links from line text
#[derive(Debug, Clone)]
pub struct LinkScanner {
    scheme: String,
    pattern: Regex,
}

impl LinkScanner {
    /// Create a scanner for links using `scheme`
    pub fn new(scheme: &str) -> Self {
        let pattern = format!(r"{}://note/(\w+)/(\w+)/", regex::escape(scheme));
        Self {
            scheme: scheme.to_string(),
            // The scheme is escaped, so the pattern always compiles
            pattern: Regex::new(&pattern).expect("link pattern is valid"),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Lazily yield every link in `text`, left to right
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = LinkMatch<'a>> + 'a {
        self.pattern.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(LinkMatch {
                uri: whole.as_str(),
                range: whole.range(),
                key: NoteKey::new(caps.get(1)?.as_str(), caps.get(2)?.as_str()),
            })
        })
    }

    /// Whether `text` carries at least one link
    pub fn has_links(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Render the link URI for a key
    pub fn link_for(&self, key: &NoteKey) -> String {
        key.to_uri(&self.scheme)
    }
}

impl Default for LinkScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

/// Resolve a link to its target note
///
/// A missing target is `Ok(None)`, not an error.
pub async fn resolve_link(store: &dyn LineStore, link: &LinkMatch<'_>) -> StoreResult<Option<NoteId>> {
    store.resolve_key(&link.key).await
}
