//! The per-file chunk list.
//!
//! Chunks live in an arena and are threaded into a doubly-linked order
//! through integer handles, so insertion (virtual braces, lambda `[]`
//! splits) is O(1) and no chunk ever moves. Navigation comes in two
//! modes: [`Nav::All`] follows raw links, [`Nav::SkipPreproc`] skips
//! preprocessor chunks when outside one and refuses to leave when
//! inside one.

use crate::lex::chars::is_kw1;
use crate::token::{ChunkFlags, TokenKind};

/// Stable handle into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(u32);

impl ChunkId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    All,
    SkipPreproc,
}

/// A single token with mutable attributes. `line`/`col`/`col_end` come
/// from the source and are never touched after tokenization.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: TokenKind,
    pub parent: TokenKind,
    pub line: u32,
    pub col: u32,
    pub col_end: u32,
    pub flags: ChunkFlags,
    pub level: i32,
    pub brace_level: i32,
    pub pp_level: i32,
    pub text: String,
    pub scope: String,
    next: Option<ChunkId>,
    prev: Option<ChunkId>,
}

impl Chunk {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, col: u32) -> Chunk {
        Chunk {
            kind,
            parent: TokenKind::None,
            line,
            col,
            col_end: col,
            flags: ChunkFlags::NONE,
            level: 0,
            brace_level: 0,
            pp_level: 0,
            text: text.into(),
            scope: String::new(),
            next: None,
            prev: None,
        }
    }
}

#[derive(Default)]
pub struct ChunkList {
    arena: Vec<Chunk>,
    head: Option<ChunkId>,
    tail: Option<ChunkId>,
}

impl ChunkList {
    pub fn new() -> ChunkList {
        ChunkList::default()
    }

    pub fn with_capacity(cap: usize) -> ChunkList {
        ChunkList {
            arena: Vec::with_capacity(cap),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head(&self) -> Option<ChunkId> {
        self.head
    }

    pub fn tail(&self) -> Option<ChunkId> {
        self.tail
    }

    pub fn get(&self, id: ChunkId) -> &Chunk {
        &self.arena[id.index()]
    }

    pub fn get_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.arena[id.index()]
    }

    pub fn push(&mut self, mut chunk: Chunk) -> ChunkId {
        let id = ChunkId(self.arena.len() as u32);
        chunk.prev = self.tail;
        chunk.next = None;
        self.arena.push(chunk);
        match self.tail {
            Some(t) => self.arena[t.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Splices a new chunk after `after`, keeping link integrity.
    pub fn insert_after(&mut self, after: ChunkId, mut chunk: Chunk) -> ChunkId {
        let id = ChunkId(self.arena.len() as u32);
        let old_next = self.arena[after.index()].next;
        chunk.prev = Some(after);
        chunk.next = old_next;
        self.arena.push(chunk);
        self.arena[after.index()].next = Some(id);
        match old_next {
            Some(n) => self.arena[n.index()].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    pub fn insert_before(&mut self, before: ChunkId, chunk: Chunk) -> ChunkId {
        match self.arena[before.index()].prev {
            Some(p) => self.insert_after(p, chunk),
            None => {
                let id = ChunkId(self.arena.len() as u32);
                let mut chunk = chunk;
                chunk.prev = None;
                chunk.next = Some(before);
                self.arena.push(chunk);
                self.arena[before.index()].prev = Some(id);
                self.head = Some(id);
                id
            }
        }
    }

    /// Unlinks a chunk from the order. The arena slot stays allocated;
    /// handles to other chunks are unaffected.
    pub fn remove(&mut self, id: ChunkId) {
        let (prev, next) = {
            let c = self.get(id);
            (c.prev, c.next)
        };
        match prev {
            Some(p) => self.arena[p.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.arena[n.index()].prev = prev,
            None => self.tail = prev,
        }
        let c = self.get_mut(id);
        c.prev = None;
        c.next = None;
    }

    // ----- navigation --------------------------------------------------

    fn raw_next(&self, id: ChunkId) -> Option<ChunkId> {
        self.arena[id.index()].next
    }

    fn raw_prev(&self, id: ChunkId) -> Option<ChunkId> {
        self.arena[id.index()].prev
    }

    fn step(&self, from: ChunkId, nav: Nav, forward: bool) -> Option<ChunkId> {
        let advance = |id| if forward { self.raw_next(id) } else { self.raw_prev(id) };
        match nav {
            Nav::All => advance(from),
            Nav::SkipPreproc => {
                let in_pp = self.get(from).flags.contains(ChunkFlags::IN_PREPROC);
                let mut cur = advance(from)?;
                if in_pp {
                    // Stay inside the directive.
                    if self.get(cur).flags.contains(ChunkFlags::IN_PREPROC) {
                        Some(cur)
                    } else {
                        None
                    }
                } else {
                    while self.get(cur).flags.contains(ChunkFlags::IN_PREPROC) {
                        cur = advance(cur)?;
                    }
                    Some(cur)
                }
            }
        }
    }

    pub fn next(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        self.step(id, nav, true)
    }

    pub fn prev(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        self.step(id, nav, false)
    }

    /// Next chunk that is not a newline.
    pub fn next_nnl(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        let mut cur = self.next(id, nav)?;
        while self.is_newline(cur) {
            cur = self.next(cur, nav)?;
        }
        Some(cur)
    }

    pub fn prev_nnl(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        let mut cur = self.prev(id, nav)?;
        while self.is_newline(cur) {
            cur = self.prev(cur, nav)?;
        }
        Some(cur)
    }

    /// Next chunk that is neither a newline nor inside a preprocessor.
    pub fn next_nnl_np(&self, id: ChunkId) -> Option<ChunkId> {
        let mut cur = self.raw_next(id)?;
        while self.is_newline(cur) || self.get(cur).flags.contains(ChunkFlags::IN_PREPROC) {
            cur = self.raw_next(cur)?;
        }
        Some(cur)
    }

    pub fn prev_nnl_np(&self, id: ChunkId) -> Option<ChunkId> {
        let mut cur = self.raw_prev(id)?;
        while self.is_newline(cur) || self.get(cur).flags.contains(ChunkFlags::IN_PREPROC) {
            cur = self.raw_prev(cur)?;
        }
        Some(cur)
    }

    /// Next chunk with the given kind; `level < 0` matches any level.
    pub fn next_of_kind(
        &self,
        id: ChunkId,
        kind: TokenKind,
        level: i32,
        nav: Nav,
    ) -> Option<ChunkId> {
        let mut cur = self.next(id, nav)?;
        loop {
            let c = self.get(cur);
            if c.kind == kind && (level < 0 || c.level == level) {
                return Some(cur);
            }
            cur = self.next(cur, nav)?;
        }
    }

    pub fn prev_of_kind(
        &self,
        id: ChunkId,
        kind: TokenKind,
        level: i32,
        nav: Nav,
    ) -> Option<ChunkId> {
        let mut cur = self.prev(id, nav)?;
        loop {
            let c = self.get(cur);
            if c.kind == kind && (level < 0 || c.level == level) {
                return Some(cur);
            }
            cur = self.prev(cur, nav)?;
        }
    }

    /// Next chunk whose text equals `text` at the given level.
    pub fn next_text(&self, id: ChunkId, text: &str, level: i32) -> Option<ChunkId> {
        let mut cur = self.next(id, Nav::All)?;
        loop {
            let c = self.get(cur);
            if c.text == text && (level < 0 || c.level == level) {
                return Some(cur);
            }
            cur = self.next(cur, Nav::All)?;
        }
    }

    /// From an opening bracket, the matching close at the same level.
    pub fn skip_to_match(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        let c = self.get(id);
        match c.kind.matching_close() {
            Some(close) => self.next_of_kind(id, close, c.level, nav),
            None => Some(id),
        }
    }

    /// From a closing bracket, the matching open.
    pub fn skip_to_match_rev(&self, id: ChunkId, nav: Nav) -> Option<ChunkId> {
        let c = self.get(id);
        match c.kind.matching_open() {
            Some(open) => self.prev_of_kind(id, open, c.level, nav),
            None => Some(id),
        }
    }

    /// First chunk of the line `id` sits on.
    pub fn first_on_line(&self, id: ChunkId) -> ChunkId {
        let mut first = id;
        let mut cur = id;
        while let Some(prev) = self.raw_prev(cur) {
            if self.is_newline(prev) {
                break;
            }
            first = prev;
            cur = prev;
        }
        first
    }

    pub fn iter(&self) -> ChunkIter<'_> {
        ChunkIter {
            list: self,
            cur: self.head,
        }
    }

    // ----- predicates --------------------------------------------------

    pub fn is_newline(&self, id: ChunkId) -> bool {
        matches!(self.get(id).kind, TokenKind::Newline | TokenKind::NlCont)
    }

    pub fn is_semicolon(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::Semicolon | TokenKind::VSemicolon
        )
    }

    pub fn is_str(&self, id: ChunkId, s: &str) -> bool {
        self.get(id).text == s
    }

    /// True if the chunk text starts like an identifier.
    pub fn is_word(&self, id: ChunkId) -> bool {
        let c = self.get(id);
        !c.text.is_empty() && is_kw1(c.text.as_bytes()[0])
    }

    pub fn is_star(&self, id: ChunkId) -> bool {
        let c = self.get(id);
        c.text == "*" && c.kind != TokenKind::OperatorVal
    }

    pub fn is_addr(&self, id: ChunkId) -> bool {
        let c = self.get(id);
        c.kind == TokenKind::Byref || (c.text == "&" && c.kind != TokenKind::OperatorVal)
    }

    /// Kinds that can participate in a type chain.
    pub fn is_type_like(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::Type
                | TokenKind::PtrType
                | TokenKind::Byref
                | TokenKind::DcMember
                | TokenKind::Qualifier
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Union
        )
    }

    pub fn is_paren_open(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::ParenOpen
                | TokenKind::SParenOpen
                | TokenKind::FParenOpen
                | TokenKind::TParenOpen
        )
    }

    pub fn is_paren_close(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::ParenClose
                | TokenKind::SParenClose
                | TokenKind::FParenClose
                | TokenKind::TParenClose
        )
    }

    pub fn is_opening_brace(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::BraceOpen | TokenKind::VBraceOpen
        )
    }

    pub fn is_closing_brace(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::BraceClose | TokenKind::VBraceClose
        )
    }

    pub fn is_vbrace(&self, id: ChunkId) -> bool {
        matches!(
            self.get(id).kind,
            TokenKind::VBraceOpen | TokenKind::VBraceClose
        )
    }

    pub fn is_preproc(&self, id: ChunkId) -> bool {
        self.get(id).flags.contains(ChunkFlags::IN_PREPROC)
    }

    // ----- field shorthands --------------------------------------------

    pub fn kind(&self, id: ChunkId) -> TokenKind {
        self.get(id).kind
    }

    pub fn set_kind(&mut self, id: ChunkId, kind: TokenKind) {
        self.get_mut(id).kind = kind;
    }

    pub fn parent(&self, id: ChunkId) -> TokenKind {
        self.get(id).parent
    }

    pub fn set_parent(&mut self, id: ChunkId, parent: TokenKind) {
        self.get_mut(id).parent = parent;
    }

    pub fn flags(&self, id: ChunkId) -> ChunkFlags {
        self.get(id).flags
    }

    pub fn add_flags(&mut self, id: ChunkId, flags: ChunkFlags) {
        let c = self.get_mut(id);
        c.flags |= flags;
    }

    pub fn del_flags(&mut self, id: ChunkId, flags: ChunkFlags) {
        let c = self.get_mut(id);
        c.flags = c.flags - flags;
    }

    pub fn level(&self, id: ChunkId) -> i32 {
        self.get(id).level
    }

    pub fn text(&self, id: ChunkId) -> &str {
        &self.get(id).text
    }
}

pub struct ChunkIter<'a> {
    list: &'a ChunkList,
    cur: Option<ChunkId>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = ChunkId;

    fn next(&mut self) -> Option<ChunkId> {
        let id = self.cur?;
        self.cur = self.list.raw_next(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ChunkList, Vec<ChunkId>) {
        let mut list = ChunkList::new();
        let ids = vec![
            list.push(Chunk::new(TokenKind::Word, "a", 1, 1)),
            list.push(Chunk::new(TokenKind::Newline, "\n", 1, 2)),
            list.push(Chunk::new(TokenKind::Word, "b", 2, 1)),
        ];
        (list, ids)
    }

    #[test]
    fn push_links_in_order() {
        let (list, ids) = sample();
        assert_eq!(list.head(), Some(ids[0]));
        assert_eq!(list.tail(), Some(ids[2]));
        let collected: Vec<_> = list.iter().collect();
        assert_eq!(collected, ids);
    }

    #[test]
    fn next_nnl_skips_newlines() {
        let (list, ids) = sample();
        assert_eq!(list.next_nnl(ids[0], Nav::All), Some(ids[2]));
        assert_eq!(list.prev_nnl(ids[2], Nav::All), Some(ids[0]));
    }

    #[test]
    fn insert_after_keeps_links() {
        let (mut list, ids) = sample();
        let mid = list.insert_after(ids[0], Chunk::new(TokenKind::Comma, ",", 1, 2));
        let collected: Vec<_> = list.iter().collect();
        assert_eq!(collected, vec![ids[0], mid, ids[1], ids[2]]);
    }

    #[test]
    fn skip_preproc_nav_refuses_to_leave() {
        let mut list = ChunkList::new();
        let a = list.push(Chunk::new(TokenKind::Word, "x", 1, 1));
        let mut pp = Chunk::new(TokenKind::Macro, "M", 2, 2);
        pp.flags |= ChunkFlags::IN_PREPROC;
        let b = list.push(pp);
        let c = list.push(Chunk::new(TokenKind::Word, "y", 3, 1));

        // outside -> skips the preproc chunk
        assert_eq!(list.next(a, Nav::SkipPreproc), Some(c));
        // inside -> cannot leave
        assert_eq!(list.next(b, Nav::SkipPreproc), None);
    }

    #[test]
    fn skip_to_match_pairs_levels() {
        let mut list = ChunkList::new();
        let mut open = Chunk::new(TokenKind::ParenOpen, "(", 1, 1);
        open.level = 0;
        let o = list.push(open);
        let mut inner = Chunk::new(TokenKind::ParenOpen, "(", 1, 2);
        inner.level = 1;
        list.push(inner);
        let mut ic = Chunk::new(TokenKind::ParenClose, ")", 1, 3);
        ic.level = 1;
        list.push(ic);
        let mut close = Chunk::new(TokenKind::ParenClose, ")", 1, 4);
        close.level = 0;
        let c = list.push(close);

        assert_eq!(list.skip_to_match(o, Nav::All), Some(c));
        assert_eq!(list.skip_to_match_rev(c, Nav::All), Some(o));
    }
}
