//! Shared infrastructure: arena ids, interned identifiers and the source map.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Range;

pub struct NodeId<T> {
    idx: u32,
    _marker: PhantomData<T>,
}

impl<T> NodeId<T> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx: idx as u32,
            _marker: PhantomData,
        }
    }

    pub fn idx(&self) -> usize {
        self.idx as usize
    }
}

impl<T> PartialEq for NodeId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T> Eq for NodeId<T> {}

impl<T> PartialOrd for NodeId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for NodeId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<T> Clone for NodeId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeId<T> {}

impl<T> Hash for NodeId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<T> Debug for NodeId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

/// Slot arena: ids stay valid for the lifetime of the arena, and freed slots
/// are never reused, so a stale id reads as `None` instead of aliasing.
pub struct Arena<T> {
    items: Vec<Option<T>>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, item: T) -> NodeId<T> {
        let id = NodeId::new(self.items.len());
        self.items.push(Some(item));
        id
    }

    pub fn get(&self, id: NodeId<T>) -> Option<&T> {
        self.items.get(id.idx()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId<T>) -> Option<&mut T> {
        self.items.get_mut(id.idx()).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: NodeId<T>) -> Option<T> {
        self.items.get_mut(id.idx()).and_then(Option::take)
    }

    pub fn contains(&self, id: NodeId<T>) -> bool {
        self.get(id).is_some()
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| item.as_ref().map(|item| (NodeId::new(idx), item)))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Debug> Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena").field("items", &self.items).finish()
    }
}

/// An interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interner {
    map: HashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), sym);
        sym
    }

    /// Look up an already interned string without interning it.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.try_resolve(sym).unwrap_or("<unknown>")
    }

    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.get(sym.index()).map(String::as_str)
    }
}

pub type SourceId = usize;
pub type Span = Range<usize>;

/// A location inside a registered source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Loc {
    pub source: SourceId,
    pub span: Span,
}

impl Loc {
    pub fn new(source: SourceId, span: Span) -> Self {
        Self { source, span }
    }

    pub fn merge(self, other: Loc) -> Loc {
        Loc {
            source: self.source,
            span: self.span.start..other.span.end,
        }
    }

    /// Location used for nodes synthesized by the engine itself (builtins).
    pub fn generated() -> Self {
        Loc {
            source: 0,
            span: 0..0,
        }
    }
}

impl ariadne::Span for Loc {
    type SourceId = SourceId;

    fn source(&self) -> &Self::SourceId {
        &self.source
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}

/// A resolved, human-oriented position: file name plus 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

struct SourceFile {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

/// Registry of source files, indexed by `SourceId`.
///
/// Source id `0` is reserved for generated code.
pub struct Sources {
    files: Vec<SourceFile>,
}

impl Sources {
    pub fn new() -> Self {
        Self {
            files: vec![SourceFile {
                name: "<generated>".to_string(),
                text: String::new(),
                line_starts: vec![0],
            }],
        }
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) -> SourceId {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();

        self.files.push(SourceFile {
            name: name.into(),
            text,
            line_starts,
        });
        self.files.len() - 1
    }

    pub fn name(&self, source: SourceId) -> &str {
        self.files
            .get(source)
            .map(|f| f.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn text(&self, source: SourceId) -> &str {
        self.files.get(source).map(|f| f.text.as_str()).unwrap_or("")
    }

    /// Map a location to its file, line and column (both 1-based).
    pub fn position(&self, loc: &Loc) -> Position {
        let Some(file) = self.files.get(loc.source) else {
            return Position {
                file: "<unknown>".to_string(),
                line: 0,
                column: 0,
                offset: loc.span.start,
            };
        };

        let offset = loc.span.start.min(file.text.len());
        let line = file.line_starts.partition_point(|&start| start <= offset);
        let line_start = file.line_starts[line.saturating_sub(1)];

        Position {
            file: file.name.clone(),
            line,
            column: offset - line_start + 1,
            offset,
        }
    }

    /// Source texts in the shape `ariadne` expects for rendering reports.
    pub fn cache(&self) -> impl ariadne::Cache<SourceId> + '_ {
        ariadne::sources(
            self.files
                .iter()
                .enumerate()
                .map(|(id, file)| (id, file.text.as_str())),
        )
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_round_trips() {
        let mut interner = Interner::default();
        let a = interner.intern("Point");
        let b = interner.intern("Point");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "Point");
        assert_eq!(interner.lookup("Missing"), None);
    }

    #[test]
    fn arena_ids_survive_removal() {
        let mut arena = Arena::default();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&"b"));
        let c = arena.alloc("c");
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn position_is_one_based() {
        let mut sources = Sources::new();
        let id = sources.add("main.em", "struct A {\n  b: B\n}\n");
        let pos = sources.position(&Loc::new(id, 13..14));
        assert_eq!(pos.file, "main.em");
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
    }
}
