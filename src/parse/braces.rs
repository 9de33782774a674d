//! Stage 3: bracket levels, statement machine, virtual braces.
//!
//! One walk over the stream drives a frame stack: brackets push and
//! pop entries, compound-statement keywords run a small expectation
//! machine (`do` expects a body then `while` then `(` then `;`), the
//! paren after if/for/switch/while/catch is retagged to a statement
//! paren, and unbraced single-statement bodies get virtual braces so
//! that level accounting is uniform downstream.
//!
//! A close that does not match the top of the stack is logged and
//! recovered by popping; it never aborts the file. Residual frames at
//! end of file (or at the end of a preprocessor directive) are dropped.

use tracing::warn;

use crate::chunk::{Chunk, ChunkId, ChunkList, Nav};
use crate::error::{IndexerError, Result};
use crate::lang::LangMask;
use crate::parse::frame::{BraceStage, FrameStack, ParseFrame, PseEntry};
use crate::token::{ChunkFlags, TokenKind};

pub fn brace_cleanup(
    list: &mut ChunkList,
    _lang: LangMask,
    filename: &str,
) -> Result<()> {
    let mut t = Tracker {
        list,
        frm: ParseFrame::default(),
        stack: FrameStack::new(),
        pp_level: 0,
        pp_stmt_count: 0,
        pp_expr_count: 0,
        filename,
    };
    t.run()
}

enum BodyDone {
    /// The statement is waiting for a continuation keyword.
    Await,
    /// The statement popped; the enclosing body may be done too.
    Continue,
}

struct Tracker<'a> {
    list: &'a mut ChunkList,
    frm: ParseFrame,
    stack: FrameStack,
    pp_level: i32,
    /// Directive-local statement/expression counters: a `#define` in
    /// the middle of code must not eat the next statement start.
    pp_stmt_count: u32,
    pp_expr_count: u32,
    filename: &'a str,
}

impl<'a> Tracker<'a> {
    fn run(&mut self) -> Result<()> {
        let mut cur = self.list.head();
        while let Some(pc) = cur {
            cur = self.process(pc)?;
        }
        Ok(())
    }

    /// Handles one chunk; returns the next chunk to process.
    fn process(&mut self, pc: ChunkId) -> Result<Option<ChunkId>> {
        let kind = self.list.kind(pc);
        let in_pp = self.list.is_preproc(pc);

        // Leaving a directive drops any frames it opened.
        if !in_pp {
            self.drop_preproc_residue();
        }

        self.list.get_mut(pc).pp_level = self.pp_level;

        if matches!(kind, TokenKind::Newline | TokenKind::NlCont) {
            self.assign_levels(pc);
            return Ok(self.list.next(pc, Nav::All));
        }

        if kind == TokenKind::Preproc {
            self.assign_levels(pc);
            // The word after '#' picked the directive kind during
            // tokenization; attribute it as the parent.
            if let Some(d) = self.list.next(pc, Nav::All) {
                let dk = self.list.kind(d);
                if dk.is_pp_directive() {
                    self.list.set_parent(pc, dk);
                    match dk {
                        TokenKind::PpIf => {
                            self.pp_level += 1;
                            self.stack.check(&mut self.frm, TokenKind::PpIf);
                        }
                        TokenKind::PpElse => {
                            // Counter state rides on the frame swap.
                            self.stack.check(&mut self.frm, TokenKind::PpElse);
                        }
                        TokenKind::PpEndif => {
                            if self.pp_level > 0 {
                                self.pp_level -= 1;
                            }
                            self.stack.check(&mut self.frm, TokenKind::PpEndif);
                        }
                        _ => {}
                    }
                }
            }
            self.pp_stmt_count = 0;
            self.pp_expr_count = 0;
            return Ok(self.list.next(pc, Nav::All));
        }

        if in_pp && (kind.is_pp_directive() || kind == TokenKind::PreprocBody) {
            self.assign_levels(pc);
            return Ok(self.list.next(pc, Nav::All));
        }

        // The statement machine stays out of directive bodies: no
        // virtual braces inside a #define.
        let consumed = if in_pp {
            false
        } else {
            self.resolve_pending(pc)?
        };

        // Statement/expression starts. Directive bodies run their own
        // counters so the surrounding code is unaffected.
        let (stmt_count, expr_count) = if in_pp {
            (&mut self.pp_stmt_count, &mut self.pp_expr_count)
        } else {
            (&mut self.frm.stmt_count, &mut self.frm.expr_count)
        };
        let mut add = ChunkFlags::NONE;
        if *stmt_count == 0 {
            add |= ChunkFlags::STMT_START | ChunkFlags::EXPR_START;
        } else if *expr_count == 0 {
            add |= ChunkFlags::EXPR_START;
        }
        *stmt_count += 1;
        *expr_count += 1;

        if self.frm.sparen_count > 0 {
            add |= ChunkFlags::IN_SPAREN;
            if self.innermost_sparen_parent() == TokenKind::For {
                add |= ChunkFlags::IN_FOR;
            }
        }
        self.list.add_flags(pc, add);

        let kind = self.list.kind(pc); // may have been retagged
        if kind.is_open() {
            self.handle_open(pc)?;
        } else if is_raw_close(kind) {
            self.handle_close(pc);
        } else {
            self.assign_levels(pc);
        }

        if !consumed && !in_pp {
            self.dispatch_statement_keyword(pc)?;
        }

        let mut anchor = pc;
        if self.list.is_semicolon(pc) && !in_pp {
            anchor = self.close_statements_after(pc);
        }

        self.update_counters(pc, in_pp);
        Ok(self.list.next(anchor, Nav::All))
    }

    fn assign_levels(&mut self, pc: ChunkId) {
        let c = self.list.get_mut(pc);
        c.level = self.frm.level;
        c.brace_level = self.frm.brace_level;
    }

    fn innermost_sparen_parent(&self) -> TokenKind {
        for entry in self.frm.pse.iter().rev() {
            if entry.kind == TokenKind::SParenOpen {
                return entry.parent;
            }
        }
        TokenKind::None
    }

    fn drop_preproc_residue(&mut self) {
        while let Some(top) = self.frm.top() {
            if !top.in_preproc {
                break;
            }
            let entry = self.frm.pop().unwrap();
            if entry.kind.is_open() {
                self.frm.level = entry.level;
                if matches!(entry.kind, TokenKind::BraceOpen | TokenKind::VBraceOpen) {
                    self.frm.brace_level -= 1;
                }
                if entry.kind == TokenKind::SParenOpen {
                    self.frm.sparen_count -= 1;
                }
            }
        }
    }

    /// Runs the expectation machine of the innermost compound
    /// statement against `pc`. May retag `pc`, insert a virtual brace
    /// before it, or consume it (`else`, the `while` of a do-loop,
    /// `catch`, `finally`). Returns true when consumed.
    fn resolve_pending(&mut self, pc: ChunkId) -> Result<bool> {
        loop {
            let Some(top) = self.frm.top() else {
                return Ok(false);
            };
            let stage = top.stage;
            let top_kind = top.kind;
            let kind = self.list.kind(pc);

            match stage {
                BraceStage::None | BraceStage::BodyOpen => return Ok(false),

                BraceStage::Paren1 | BraceStage::OpParen1 => {
                    if kind == TokenKind::ParenOpen {
                        self.list.set_kind(pc, TokenKind::SParenOpen);
                        self.list.set_parent(pc, top_kind);
                        self.frm.top_mut().unwrap().stage = BraceStage::Brace2;
                        return Ok(false);
                    }
                    if stage == BraceStage::OpParen1 {
                        // Optional paren absent: straight to the body.
                        self.frm.top_mut().unwrap().stage = BraceStage::Brace2;
                        continue;
                    }
                    warn!(
                        "{}:{} expected '(' after {:?}, got {:?}",
                        self.filename,
                        self.list.get(pc).line,
                        top_kind,
                        kind
                    );
                    self.frm.pop();
                    continue;
                }

                BraceStage::WodParen => {
                    if kind == TokenKind::ParenOpen {
                        self.list.set_kind(pc, TokenKind::SParenOpen);
                        self.list.set_parent(pc, TokenKind::WhileOfDo);
                        self.frm.top_mut().unwrap().stage = BraceStage::WodSemi;
                        return Ok(false);
                    }
                    self.frm.pop();
                    continue;
                }

                BraceStage::WodSemi => {
                    if kind == TokenKind::Semicolon {
                        // do-while complete; the ';' still processes
                        // normally and closes enclosing vbraces.
                        self.frm.pop();
                    } else {
                        self.frm.pop();
                        continue;
                    }
                    return Ok(false);
                }

                BraceStage::BraceDo | BraceStage::Brace2 | BraceStage::ElseIf => {
                    if stage == BraceStage::ElseIf && kind == TokenKind::If {
                        // else-if chain restarts the paren stage.
                        let top = self.frm.top_mut().unwrap();
                        top.kind = TokenKind::If;
                        top.stage = BraceStage::Paren1;
                        return Ok(true);
                    }
                    if kind == TokenKind::BraceOpen {
                        self.list.set_parent(pc, top_kind);
                        self.frm.top_mut().unwrap().stage = BraceStage::BodyOpen;
                        return Ok(false);
                    }
                    // Single-statement body: wrap it in a virtual
                    // brace and reconsider the token.
                    self.insert_vbrace_open(pc, top_kind)?;
                    self.frm.top_mut().unwrap().stage = BraceStage::None;
                    let n = self.frm.pse.len();
                    self.frm.pse[n - 2].stage = BraceStage::BodyOpen;
                    continue;
                }

                BraceStage::Else => {
                    if kind == TokenKind::Else {
                        let top = self.frm.top_mut().unwrap();
                        top.kind = TokenKind::Else;
                        top.stage = BraceStage::ElseIf;
                        return Ok(true);
                    }
                    self.frm.pop();
                    self.close_statements_before(pc);
                    continue;
                }

                BraceStage::While => {
                    if kind == TokenKind::While {
                        self.list.set_kind(pc, TokenKind::WhileOfDo);
                        let top = self.frm.top_mut().unwrap();
                        top.stage = BraceStage::WodParen;
                        return Ok(true);
                    }
                    self.frm.pop();
                    self.close_statements_before(pc);
                    continue;
                }

                BraceStage::Catch => {
                    if kind == TokenKind::Catch {
                        let top = self.frm.top_mut().unwrap();
                        top.kind = TokenKind::Catch;
                        top.stage = BraceStage::OpParen1;
                        return Ok(true);
                    }
                    if kind == TokenKind::Finally {
                        let top = self.frm.top_mut().unwrap();
                        top.kind = TokenKind::Finally;
                        top.stage = BraceStage::Brace2;
                        return Ok(true);
                    }
                    self.frm.pop();
                    self.close_statements_before(pc);
                    continue;
                }
            }
        }
    }

    fn handle_open(&mut self, pc: ChunkId) -> Result<()> {
        let kind = self.list.kind(pc);
        self.assign_levels(pc);

        let stmt_body = self
            .frm
            .top()
            .map(|t| t.stage == BraceStage::BodyOpen && t.open.is_none())
            .unwrap_or(false)
            && kind == TokenKind::BraceOpen;

        let entry = PseEntry {
            kind,
            parent: self.list.parent(pc),
            level: self.frm.level,
            open: Some(pc),
            stage: BraceStage::None,
            in_preproc: self.list.is_preproc(pc),
            stmt_body,
        };

        self.frm.level += 1;
        if matches!(kind, TokenKind::BraceOpen | TokenKind::VBraceOpen) {
            self.frm.brace_level += 1;
        }
        if kind == TokenKind::SParenOpen {
            self.frm.sparen_count += 1;
        }

        if !self.frm.push(entry) {
            return Err(IndexerError::FrameOverflow {
                file: self.filename.to_string(),
                line: self.list.get(pc).line,
            });
        }
        Ok(())
    }

    fn handle_close(&mut self, pc: ChunkId) {
        let kind = self.list.kind(pc);

        let matches_top = self
            .frm
            .top()
            .map(|t| t.kind.is_open() && close_family(t.kind) == kind)
            .unwrap_or(false);

        if !matches_top {
            // Recovery: a stray '>' is far more likely a comparison
            // than a bracket; anything else pops to a match.
            if kind == TokenKind::AngleClose {
                self.list.set_kind(pc, TokenKind::Compare);
                self.assign_levels(pc);
                return;
            }
            let found = self
                .frm
                .pse
                .iter()
                .rposition(|e| e.kind.is_open() && close_family(e.kind) == kind);
            let Some(found) = found else {
                warn!(
                    "{}:{} unmatched '{}'",
                    self.filename,
                    self.list.get(pc).line,
                    self.list.text(pc)
                );
                self.assign_levels(pc);
                return;
            };
            warn!(
                "{}:{} mismatched '{}', recovering",
                self.filename,
                self.list.get(pc).line,
                self.list.text(pc)
            );
            while self.frm.pse.len() > found + 1 {
                let entry = self.frm.pop().unwrap();
                if entry.kind.is_open() {
                    self.frm.level = entry.level;
                    if matches!(entry.kind, TokenKind::BraceOpen | TokenKind::VBraceOpen) {
                        self.frm.brace_level -= 1;
                    }
                    if entry.kind == TokenKind::SParenOpen {
                        self.frm.sparen_count -= 1;
                    }
                }
            }
        }

        let entry = self.frm.pop().unwrap();
        self.frm.level = entry.level;
        if matches!(entry.kind, TokenKind::BraceOpen | TokenKind::VBraceOpen) {
            self.frm.brace_level -= 1;
        }
        if entry.kind == TokenKind::SParenOpen {
            self.frm.sparen_count -= 1;
        }

        if let Some(close) = entry.kind.matching_close() {
            self.list.set_kind(pc, close);
        }
        if entry.parent != TokenKind::None {
            self.list.set_parent(pc, entry.parent);
        }
        self.assign_levels(pc);

        if entry.stmt_body {
            // The brace body of the pending statement closed.
            self.body_finished_cascade(pc);
        }
    }

    /// After the body of the innermost statement finished at `anchor`,
    /// advance or pop statement frames; enclosing virtual braces close
    /// *before* the next token.
    fn close_statements_before(&mut self, next_tok: ChunkId) {
        loop {
            let Some(top) = self.frm.top() else { return };
            if top.kind == TokenKind::VBraceOpen && top.stmt_body {
                let entry = self.frm.pop().unwrap();
                self.insert_vbrace_close_before(next_tok, &entry);
                match self.body_done() {
                    BodyDone::Await => return,
                    BodyDone::Continue => continue,
                }
            }
            return;
        }
    }

    /// A `;` terminated the current simple statement: close enclosing
    /// virtual braces right after it and advance statement frames.
    fn close_statements_after(&mut self, semi: ChunkId) -> ChunkId {
        let mut anchor = semi;
        loop {
            let Some(top) = self.frm.top() else {
                return anchor;
            };
            if top.kind == TokenKind::VBraceOpen && top.stmt_body {
                let entry = self.frm.pop().unwrap();
                anchor = self.insert_vbrace_close_after(anchor, &entry);
                match self.body_done() {
                    BodyDone::Await => return anchor,
                    BodyDone::Continue => continue,
                }
            }
            return anchor;
        }
    }

    fn body_finished_cascade(&mut self, anchor: ChunkId) {
        match self.body_done() {
            BodyDone::Await => {}
            BodyDone::Continue => {
                // The whole statement ended at this '}'; enclosing
                // vbraces close right after it.
                self.close_statements_after(anchor);
            }
        }
    }

    /// The body of the top statement frame completed.
    fn body_done(&mut self) -> BodyDone {
        let Some(top) = self.frm.top_mut() else {
            return BodyDone::Await;
        };
        if top.open.is_some() || top.stage != BraceStage::BodyOpen {
            return BodyDone::Await;
        }
        match top.kind {
            TokenKind::If => {
                top.stage = BraceStage::Else;
                BodyDone::Await
            }
            TokenKind::Do => {
                top.stage = BraceStage::While;
                BodyDone::Await
            }
            TokenKind::Try | TokenKind::Catch => {
                top.stage = BraceStage::Catch;
                BodyDone::Await
            }
            _ => {
                self.frm.pop();
                BodyDone::Continue
            }
        }
    }

    fn insert_vbrace_open(&mut self, before: ChunkId, parent: TokenKind) -> Result<()> {
        let (line, col, flags, pp) = {
            let c = self.list.get(before);
            (c.line, c.col, c.flags.copy_part(), c.pp_level)
        };
        let mut vb = Chunk::new(TokenKind::VBraceOpen, "", line, col);
        vb.parent = parent;
        vb.flags = flags;
        vb.level = self.frm.level;
        vb.brace_level = self.frm.brace_level;
        vb.pp_level = pp;
        let id = self.list.insert_before(before, vb);

        let entry = PseEntry {
            kind: TokenKind::VBraceOpen,
            parent,
            level: self.frm.level,
            open: Some(id),
            stage: BraceStage::None,
            in_preproc: false,
            stmt_body: true,
        };
        self.frm.level += 1;
        self.frm.brace_level += 1;
        self.frm.stmt_count = 0;
        self.frm.expr_count = 0;
        if !self.frm.push(entry) {
            return Err(IndexerError::FrameOverflow {
                file: self.filename.to_string(),
                line,
            });
        }
        Ok(())
    }

    fn make_vbrace_close(&mut self, at: ChunkId, entry: &PseEntry) -> Chunk {
        self.frm.level = entry.level;
        self.frm.brace_level -= 1;
        self.frm.stmt_count = 0;
        self.frm.expr_count = 0;
        let (line, col, pp) = {
            let c = self.list.get(at);
            (c.line, c.col_end, c.pp_level)
        };
        let mut vb = Chunk::new(TokenKind::VBraceClose, "", line, col);
        vb.parent = entry.parent;
        vb.level = self.frm.level;
        vb.brace_level = self.frm.brace_level;
        vb.pp_level = pp;
        vb
    }

    fn insert_vbrace_close_after(&mut self, anchor: ChunkId, entry: &PseEntry) -> ChunkId {
        let vb = self.make_vbrace_close(anchor, entry);
        self.list.insert_after(anchor, vb)
    }

    fn insert_vbrace_close_before(&mut self, next_tok: ChunkId, entry: &PseEntry) -> ChunkId {
        let vb = self.make_vbrace_close(next_tok, entry);
        self.list.insert_before(next_tok, vb)
    }

    fn dispatch_statement_keyword(&mut self, pc: ChunkId) -> Result<()> {
        let kind = self.list.kind(pc);
        let stage = match kind {
            TokenKind::If | TokenKind::For | TokenKind::Switch | TokenKind::While => {
                BraceStage::Paren1
            }
            TokenKind::Do => BraceStage::BraceDo,
            TokenKind::Try => BraceStage::Brace2,
            TokenKind::Catch => BraceStage::OpParen1,
            TokenKind::DVersion | TokenKind::Invariant => BraceStage::OpParen1,
            _ => return Ok(()),
        };
        let entry = PseEntry {
            kind,
            parent: TokenKind::None,
            level: self.frm.level,
            open: None,
            stage,
            in_preproc: self.list.is_preproc(pc),
            stmt_body: false,
        };
        if !self.frm.push(entry) {
            return Err(IndexerError::FrameOverflow {
                file: self.filename.to_string(),
                line: self.list.get(pc).line,
            });
        }
        Ok(())
    }

    fn update_counters(&mut self, pc: ChunkId, in_pp: bool) {
        let kind = self.list.kind(pc);
        if in_pp {
            // Only expression boundaries matter inside a directive.
            if matches!(
                kind,
                TokenKind::ParenOpen
                    | TokenKind::FParenOpen
                    | TokenKind::Comma
                    | TokenKind::Assign
                    | TokenKind::Arith
                    | TokenKind::Compare
                    | TokenKind::BoolOp
                    | TokenKind::Question
                    | TokenKind::Colon
            ) {
                self.pp_expr_count = 0;
            }
            return;
        }
        // The clauses of a for(;;) are statements of their own.
        if kind == TokenKind::SParenOpen && self.list.parent(pc) == TokenKind::For {
            self.frm.stmt_count = 0;
            self.frm.expr_count = 0;
            return;
        }
        match kind {
            TokenKind::Semicolon
            | TokenKind::VSemicolon
            | TokenKind::BraceOpen
            | TokenKind::BraceClose
            | TokenKind::VBraceOpen
            | TokenKind::VBraceClose => {
                self.frm.stmt_count = 0;
                self.frm.expr_count = 0;
            }
            TokenKind::Colon => {
                // Label / case / access colons end a statement; colons
                // inside parens do not.
                let inside_parens = self
                    .frm
                    .top()
                    .map(|t| t.kind.is_open() && t.kind != TokenKind::BraceOpen && t.kind != TokenKind::VBraceOpen)
                    .unwrap_or(false);
                if inside_parens {
                    self.frm.expr_count = 0;
                } else {
                    self.frm.stmt_count = 0;
                    self.frm.expr_count = 0;
                }
            }
            TokenKind::ParenOpen
            | TokenKind::SParenOpen
            | TokenKind::FParenOpen
            | TokenKind::TParenOpen
            | TokenKind::SquareOpen
            | TokenKind::AngleOpen
            | TokenKind::Assign
            | TokenKind::Arith
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Amp
            | TokenKind::Caret
            | TokenKind::Compare
            | TokenKind::BoolOp
            | TokenKind::Not
            | TokenKind::Inv
            | TokenKind::Question
            | TokenKind::Comma
            | TokenKind::Return
            | TokenKind::Goto
            | TokenKind::Continue
            | TokenKind::Case
            | TokenKind::Throw
            | TokenKind::New
            | TokenKind::Ellipsis => {
                self.frm.expr_count = 0;
            }
            _ => {}
        }
    }
}

fn is_raw_close(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::ParenClose
            | TokenKind::BraceClose
            | TokenKind::SquareClose
            | TokenKind::AngleClose
    )
}

fn close_family(open: TokenKind) -> TokenKind {
    match open {
        TokenKind::ParenOpen | TokenKind::SParenOpen | TokenKind::FParenOpen | TokenKind::TParenOpen => {
            TokenKind::ParenClose
        }
        TokenKind::BraceOpen => TokenKind::BraceClose,
        TokenKind::VBraceOpen => TokenKind::VBraceClose,
        TokenKind::SquareOpen => TokenKind::SquareClose,
        TokenKind::AngleOpen => TokenKind::AngleClose,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::LANG_C;
    use crate::lex::tokenize;
    use crate::parse::cleanup::tokenize_cleanup;

    fn prep(src: &str, lang: LangMask) -> ChunkList {
        let mut list = ChunkList::new();
        tokenize(src.as_bytes(), lang, 8, "test", &mut list).unwrap();
        tokenize_cleanup(&mut list, lang);
        brace_cleanup(&mut list, lang, "test").unwrap();
        list
    }

    fn find(list: &ChunkList, text: &str) -> ChunkId {
        list.iter().find(|&id| list.text(id) == text).unwrap()
    }

    #[test]
    fn sparen_retag_after_if() {
        let list = prep("if (a) { b(); }", LANG_C);
        let open = find(&list, "(");
        assert_eq!(list.kind(open), TokenKind::SParenOpen);
        assert_eq!(list.parent(open), TokenKind::If);
        let close = find(&list, ")");
        assert_eq!(list.kind(close), TokenKind::SParenClose);
        // inner chunk carries IN_SPAREN
        let a = find(&list, "a");
        assert!(list.flags(a).contains(ChunkFlags::IN_SPAREN));
    }

    #[test]
    fn vbrace_wraps_single_statement() {
        let list = prep("if (a) b();", LANG_C);
        let kinds: Vec<_> = list.iter().map(|id| list.kind(id)).collect();
        assert!(kinds.contains(&TokenKind::VBraceOpen));
        assert!(kinds.contains(&TokenKind::VBraceClose));
        let b = find(&list, "b");
        assert_eq!(list.get(b).brace_level, 1);
        assert!(list.flags(b).contains(ChunkFlags::STMT_START));
    }

    #[test]
    fn nested_unbraced_ifs_close_in_order() {
        let list = prep("if (a) if (b) c(); d();", LANG_C);
        let d = find(&list, "d");
        assert_eq!(list.get(d).brace_level, 0, "d is outside both ifs");
        let c = find(&list, "c");
        assert_eq!(list.get(c).brace_level, 2);
    }

    #[test]
    fn do_while_machine() {
        let list = prep("do { x(); } while (y);", LANG_C);
        let w = find(&list, "while");
        assert_eq!(list.kind(w), TokenKind::WhileOfDo);
        let open = list.next_nnl(w, Nav::All).unwrap();
        assert_eq!(list.kind(open), TokenKind::SParenOpen);
        assert_eq!(list.parent(open), TokenKind::WhileOfDo);
    }

    #[test]
    fn else_chain() {
        let list = prep("if (a) b(); else c();", LANG_C);
        let c = find(&list, "c");
        assert_eq!(list.get(c).brace_level, 1);
        // both bodies closed by end of input
        let mut depth = 0;
        for id in list.iter() {
            match list.kind(id) {
                TokenKind::VBraceOpen => depth += 1,
                TokenKind::VBraceClose => depth -= 1,
                _ => {}
            }
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn braces_inside_if_else_preproc_both_branches() {
        let src = "#if A\nint f(void) {\n#else\nint f(int x) {\n#endif\n  return 0;\n}\n";
        let list = prep(src, LANG_C);
        // the final close brace must match level 0
        let mut last_close = None;
        for id in list.iter() {
            if list.kind(id) == TokenKind::BraceClose {
                last_close = Some(id);
            }
        }
        let last_close = last_close.unwrap();
        assert_eq!(list.get(last_close).level, 0);
    }

    #[test]
    fn unmatched_close_recovers() {
        let list = prep("void f() { if (a } x; }", LANG_C);
        // no panic, and the stream still ends at level 0
        let tail = list.tail().unwrap();
        assert_eq!(list.get(tail).level, 0);
    }

    #[test]
    fn stmt_and_expr_starts() {
        let list = prep("a = b + c; d();", LANG_C);
        let a = find(&list, "a");
        assert!(list.flags(a).contains(ChunkFlags::STMT_START));
        let b = find(&list, "b");
        assert!(list.flags(b).contains(ChunkFlags::EXPR_START));
        let c = find(&list, "c");
        assert!(list.flags(c).contains(ChunkFlags::EXPR_START));
        let d = find(&list, "d");
        assert!(list.flags(d).contains(ChunkFlags::STMT_START));
    }

    #[test]
    fn for_sparen_sets_in_for() {
        let list = prep("for (i = 0; i < 3; i++) x();", LANG_C);
        let i = find(&list, "i");
        assert!(list.flags(i).contains(ChunkFlags::IN_FOR));
        assert!(list.flags(i).contains(ChunkFlags::IN_SPAREN));
    }

    #[test]
    fn levels_pair_for_every_bracket() {
        let list = prep("void f(int a) { if (a) { g(a[1]); } }", LANG_C);
        let mut stack: Vec<(TokenKind, i32)> = Vec::new();
        for id in list.iter() {
            let k = list.kind(id);
            if k.is_open() {
                stack.push((k, list.get(id).level));
            } else if k.is_close() {
                let (ok, lvl) = stack.pop().unwrap();
                assert_eq!(ok.matching_close().unwrap(), k);
                assert_eq!(lvl, list.get(id).level);
            }
        }
        assert!(stack.is_empty());
    }
}
