//! Link graph resolution
//!
//! Walks forward links depth-first from one or more root notes.
//!
//! - In [`ExportMode::Embed`] every resolvable link line is replaced by the
//!   fully resolved lines of its target, producing one self-contained
//!   document.
//! - In [`ExportMode::Link`] lines stay verbatim and every reachable note is
//!   listed once as its own export unit.
//!
//! Two guard sets are kept apart. The path set holds the notes on the
//! current chain of recursive calls and is cloned into each call, so a link
//! back to an ancestor is never followed. The expanded set spans the whole
//! traversal and keeps the unit list free of duplicates. Every recursive
//! call adds one note to the path, so recursion depth is bounded by the
//! number of distinct reachable notes.

use std::collections::{HashMap, HashSet};

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{ExportMode, Line, NoteId, NoteKey};
use crate::scanner::LinkScanner;
use crate::store::{LineStore, StoreError, StoreResult};

/// A link whose target could not be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionMiss {
    /// Note holding the link
    pub source: NoteId,
    /// Line of the source note holding the link
    pub line_index: usize,
    pub uri: String,
}

/// A link that was left unexpanded because it points back into the
/// current path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleGuard {
    pub source: NoteId,
    pub target: NoteId,
    pub line_index: usize,
}

/// Output of a traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved lines of the roots, in root order
    pub lines: Vec<Line>,
    /// Notes to export as separate documents. Roots only in embed mode;
    /// every distinct reachable note in link mode.
    pub units: Vec<NoteId>,
    /// Notes inlined into `lines` (embed mode), each listed once. Their
    /// embedded resources must follow the content.
    pub embedded: Vec<NoteId>,
    pub misses: Vec<ResolutionMiss>,
    pub cycles: Vec<CycleGuard>,
}

/// Resolve the link graph below `roots`
///
/// `root_visited` seeds the path guard; notes in it are never expanded.
/// A missing root is an error, a missing link target is recorded in
/// [`Resolution::misses`].
pub async fn resolve(
    store: &dyn LineStore,
    scanner: &LinkScanner,
    roots: &[NoteId],
    mode: ExportMode,
    root_visited: &HashSet<NoteId>,
) -> StoreResult<Resolution> {
    let mut traversal = Traversal::new(store, scanner, mode);

    for &root in roots {
        traversal.enlist(root);
        match traversal.visit(root, root_visited.clone()).await? {
            Some(lines) => traversal.out.lines.extend(lines),
            None => return Err(StoreError::NoteNotFound(root)),
        }
    }

    debug!(
        "Resolved {} root(s) in {:?} mode: {} lines, {} units, {} embedded, {} misses, {} cycles",
        roots.len(),
        mode,
        traversal.out.lines.len(),
        traversal.out.units.len(),
        traversal.out.embedded.len(),
        traversal.out.misses.len(),
        traversal.out.cycles.len()
    );

    Ok(traversal.out)
}

struct Traversal<'a> {
    store: &'a dyn LineStore,
    scanner: &'a LinkScanner,
    mode: ExportMode,
    /// Notes already listed, traversal-wide
    expanded: HashSet<NoteId>,
    embedded: HashSet<NoteId>,
    /// Lines read so far; each note is read from the store at most once
    cache: HashMap<NoteId, Vec<Line>>,
    out: Resolution,
}

impl<'a> Traversal<'a> {
    fn new(store: &'a dyn LineStore, scanner: &'a LinkScanner, mode: ExportMode) -> Self {
        Self {
            store,
            scanner,
            mode,
            expanded: HashSet::new(),
            embedded: HashSet::new(),
            cache: HashMap::new(),
            out: Resolution::default(),
        }
    }

    fn enlist(&mut self, note: NoteId) {
        if self.expanded.insert(note) {
            self.out.units.push(note);
        }
    }

    async fn read(&mut self, note: NoteId) -> StoreResult<Option<Vec<Line>>> {
        if let Some(lines) = self.cache.get(&note) {
            return Ok(Some(lines.clone()));
        }
        match self.store.get_lines(note).await {
            Ok(lines) => {
                self.cache.insert(note, lines.clone());
                Ok(Some(lines))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn miss(&mut self, source: NoteId, line_index: usize, uri: String) {
        warn!("Link target not found: {} (note {}, line {})", uri, source, line_index);
        self.out.misses.push(ResolutionMiss {
            source,
            line_index,
            uri,
        });
    }

    /// Resolve one note. `Ok(None)` when the note no longer exists.
    fn visit<'t>(
        &'t mut self,
        note: NoteId,
        mut path: HashSet<NoteId>,
    ) -> BoxFuture<'t, StoreResult<Option<Vec<Line>>>> {
        async move {
            path.insert(note);

            let Some(lines) = self.read(note).await? else {
                return Ok(None);
            };

            let mut output = Vec::with_capacity(lines.len());
            for (line_index, line) in lines.into_iter().enumerate() {
                let links: Vec<(String, NoteKey)> = self
                    .scanner
                    .scan(&line)
                    .map(|m| (m.uri.to_string(), m.key))
                    .collect();

                if links.is_empty() {
                    output.push(line);
                    continue;
                }

                let mut inlined: Vec<Line> = Vec::new();
                let mut keep_line = false;

                for (uri, key) in links {
                    let Some(target) = self.store.resolve_key(&key).await? else {
                        self.miss(note, line_index, uri);
                        keep_line = true;
                        continue;
                    };

                    if path.contains(&target) {
                        debug!("Cycle guarded: note {} -> note {}", note, target);
                        self.out.cycles.push(CycleGuard {
                            source: note,
                            target,
                            line_index,
                        });
                        keep_line = true;
                        continue;
                    }

                    match self.mode {
                        ExportMode::Embed => match self.visit(target, path.clone()).await? {
                            Some(sub) if !sub.is_empty() => {
                                inlined.extend(sub);
                                if self.embedded.insert(target) {
                                    self.out.embedded.push(target);
                                }
                            }
                            Some(_) => keep_line = true,
                            None => {
                                self.miss(note, line_index, uri);
                                keep_line = true;
                            }
                        },
                        ExportMode::Link => {
                            keep_line = true;
                            if self.expanded.contains(&target) {
                                continue;
                            }
                            self.enlist(target);
                            if self.visit(target, path.clone()).await?.is_none() {
                                self.out.units.retain(|u| *u != target);
                                self.miss(note, line_index, uri);
                            }
                        }
                    }
                }

                if keep_line || inlined.is_empty() {
                    output.push(line);
                }
                output.extend(inlined);
            }

            Ok(Some(output))
        }
        .boxed()
    }
}
