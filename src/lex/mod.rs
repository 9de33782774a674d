//! Stage 1: byte buffer -> chunk stream.
//!
//! The tokenizer is deliberately loose: it accepts number formats and
//! string forms from every supported language no matter which one is
//! active, because missing context must never abort a file. Garbage
//! bytes become [`TokenKind::Unknown`] chunks and scanning continues.

pub mod chars;
pub mod keywords;
pub mod punctuators;

use tracing::warn;

use crate::chunk::{Chunk, ChunkList, Nav};
use crate::error::{IndexerError, Result};
use crate::lang::{LangMask, LANG_CPP, LANG_CS, LANG_D, LANG_JAVA, LANG_OC, LANG_PAWN};
use crate::token::{ChunkFlags, TokenKind};

use chars::{is_bin_, is_blank, is_dec, is_dec_, is_hex_, is_kw1, is_kw2, is_oct_};
use keywords::{find_keyword, PpPos};
use punctuators::find_punctuator;

/// Column advance for a tab at `col`.
fn next_tab_column(col: u32, tab_size: u32) -> u32 {
    1 + (((col - 1) / tab_size) + 1) * tab_size
}

#[derive(Debug, Clone, Copy)]
struct TokInfo {
    last_ch: i32,
    idx: usize,
    row: u32,
    col: u32,
}

impl Default for TokInfo {
    fn default() -> TokInfo {
        TokInfo {
            last_ch: 0,
            idx: 0,
            row: 1,
            col: 1,
        }
    }
}

/// Cursor over the byte buffer with save/restore for speculative
/// parses. UTF-8 continuation bytes do not advance the column.
struct TokCtx<'a> {
    data: &'a [u8],
    c: TokInfo,
    s: TokInfo,
    tab_size: u32,
}

impl<'a> TokCtx<'a> {
    fn new(data: &'a [u8], tab_size: u32) -> TokCtx<'a> {
        TokCtx {
            data,
            c: TokInfo::default(),
            s: TokInfo::default(),
            tab_size,
        }
    }

    fn save(&mut self) {
        self.s = self.c;
    }

    fn restore(&mut self) {
        self.c = self.s;
    }

    fn mark(&self) -> TokInfo {
        self.c
    }

    fn rewind(&mut self, info: TokInfo) {
        self.c = info;
    }

    fn more(&self) -> bool {
        self.c.idx < self.data.len()
    }

    fn peek(&self) -> i32 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> i32 {
        match self.data.get(self.c.idx + offset) {
            Some(&b) => b as i32,
            None => -1,
        }
    }

    fn get(&mut self) -> i32 {
        if !self.more() {
            return -1;
        }
        let ch = self.data[self.c.idx];
        self.c.idx += 1;
        match ch {
            b'\t' => self.c.col = next_tab_column(self.c.col, self.tab_size),
            b'\n' => {
                if self.c.last_ch != i32::from(b'\r') {
                    self.c.row += 1;
                    self.c.col = 1;
                }
            }
            b'\r' => {
                self.c.row += 1;
                self.c.col = 1;
            }
            _ => {
                // UTF-8 continuation bytes share the column.
                if ch & 0xC0 != 0x80 {
                    self.c.col += 1;
                }
            }
        }
        self.c.last_ch = i32::from(ch);
        i32::from(ch)
    }

    fn expect(&mut self, ch: u8) -> bool {
        if self.peek() == i32::from(ch) {
            self.get();
            true
        } else {
            false
        }
    }
}

/// One token under construction. Text collects as raw bytes so that a
/// stray non-UTF-8 byte cannot poison the chunk; the conversion to
/// string happens once, lossily, when the chunk is pushed.
struct TokBuf {
    kind: TokenKind,
    text: Vec<u8>,
    line: u32,
    col: u32,
    flags: ChunkFlags,
}

impl TokBuf {
    fn new() -> TokBuf {
        TokBuf {
            kind: TokenKind::None,
            text: Vec::new(),
            line: 0,
            col: 0,
            flags: ChunkFlags::NONE,
        }
    }

    fn push(&mut self, ch: i32) {
        if ch >= 0 {
            self.text.push(ch as u8);
        }
    }
}

struct Lexer<'a> {
    ctx: TokCtx<'a>,
    lang: LangMask,
    filename: &'a str,
}

impl<'a> Lexer<'a> {
    fn parse_whitespace(&mut self, tok: &mut TokBuf) -> bool {
        let mut nl_found = false;
        let mut any = false;
        while self.ctx.peek() >= 0 && (self.ctx.peek() as u8).is_ascii_whitespace() {
            if self.ctx.get() == i32::from(b'\n') {
                nl_found = true;
            }
            any = true;
        }
        if any {
            tok.kind = if nl_found {
                TokenKind::Newline
            } else {
                TokenKind::Whitespace
            };
        }
        any
    }

    /// `\` followed by nothing but whitespace up to the newline.
    fn parse_bs_newline(&mut self, tok: &mut TokBuf) -> bool {
        self.ctx.save();
        self.ctx.get(); // the '\'
        loop {
            let ch = self.ctx.peek();
            if ch < 0 || !(ch as u8).is_ascii_whitespace() {
                break;
            }
            self.ctx.get();
            if ch == i32::from(b'\r') || ch == i32::from(b'\n') {
                if ch == i32::from(b'\r') {
                    self.ctx.expect(b'\n');
                }
                tok.text = b"\\".to_vec();
                tok.kind = TokenKind::NlCont;
                return true;
            }
        }
        self.ctx.restore();
        false
    }

    /// `//`, `/* */`, and for D the nestable `/+ +/`. Comments are
    /// whitespace as far as the chunk stream is concerned.
    fn parse_comment(&mut self, tok: &mut TokBuf) -> bool {
        let is_d = self.lang & LANG_D != 0;
        let ch = self.ctx.peek_at(1);

        if self.ctx.peek() != i32::from(b'/')
            || (ch != i32::from(b'*')
                && ch != i32::from(b'/')
                && (ch != i32::from(b'+') || !is_d))
        {
            return false;
        }

        self.ctx.save();
        self.ctx.get();
        self.ctx.get();

        if ch == i32::from(b'/') {
            tok.kind = TokenKind::Whitespace;
            loop {
                let mut bs_cnt = 0;
                loop {
                    let c = self.ctx.peek();
                    if c < 0 || c == i32::from(b'\r') || c == i32::from(b'\n') {
                        break;
                    }
                    if c == i32::from(b'\\') {
                        bs_cnt += 1;
                    } else {
                        bs_cnt = 0;
                    }
                    self.ctx.get();
                }
                // An odd run of backslashes right before the newline
                // continues the comment on the next line.
                if bs_cnt % 2 == 0 || !self.ctx.more() {
                    break;
                }
                if self.ctx.peek() == i32::from(b'\r') {
                    self.ctx.get();
                }
                if self.ctx.peek() == i32::from(b'\n') {
                    self.ctx.get();
                }
            }
        } else if !self.ctx.more() {
            self.ctx.restore();
            return false;
        } else if ch == i32::from(b'*') {
            tok.kind = TokenKind::Whitespace;
            loop {
                let c = self.ctx.get();
                if c < 0 {
                    break;
                }
                if c == i32::from(b'*') && self.ctx.peek() == i32::from(b'/') {
                    self.ctx.get();
                    break;
                }
            }
        } else {
            // D nestable comment: depth counting on /+ and +/.
            tok.kind = TokenKind::Whitespace;
            let mut depth = 1;
            while depth > 0 && self.ctx.more() {
                if self.ctx.peek() == i32::from(b'+') && self.ctx.peek_at(1) == i32::from(b'/') {
                    self.ctx.get();
                    self.ctx.get();
                    depth -= 1;
                    continue;
                }
                if self.ctx.peek() == i32::from(b'/') && self.ctx.peek_at(1) == i32::from(b'+') {
                    self.ctx.get();
                    self.ctx.get();
                    depth += 1;
                    continue;
                }
                let c = self.ctx.get();
                if c == i32::from(b'\r') && self.ctx.peek() == i32::from(b'\n') {
                    self.ctx.get();
                }
            }
        }
        true
    }

    /// User-defined literal suffix after a number/string. Format macro
    /// prefixes (`PRIx32`, `SCNu64`) are rolled back for strings.
    fn parse_suffix(&mut self, tok: &mut TokBuf, forstring: bool) {
        if self.ctx.peek() < 0 || !is_kw1(self.ctx.peek() as u8) {
            return;
        }
        let p1 = self.ctx.peek();
        let p2 = self.ctx.peek_at(1);
        if forstring
            && ((p1 == i32::from(b'L') && (p2 == i32::from(b'"') || p2 == i32::from(b'\'')))
                || (p1 == i32::from(b'S') && p2 == i32::from(b'"')))
        {
            return;
        }
        let mark = self.ctx.mark();
        let old_len = tok.text.len();
        let mut slen = 0;
        while self.ctx.more() && is_kw2(self.ctx.peek() as u8) {
            slen += 1;
            tok.push(self.ctx.get());
        }
        if forstring && slen >= 4 {
            let suffix = &tok.text[old_len..];
            if suffix.starts_with(b"PRI") || suffix.starts_with(b"SCN") {
                self.ctx.rewind(mark);
                tok.text.truncate(old_len);
            }
        }
    }

    fn parse_number(&mut self, tok: &mut TokBuf) -> bool {
        let peek0 = self.ctx.peek();
        let peek1 = self.ctx.peek_at(1);
        if !(peek0 >= 0 && is_dec(peek0 as u8))
            && !(peek0 == i32::from(b'.') && peek1 >= 0 && is_dec(peek1 as u8))
        {
            return false;
        }

        let mut is_float = peek0 == i32::from(b'.');
        if is_float && peek1 == i32::from(b'.') {
            return false;
        }
        let mut did_hex = false;

        if self.ctx.peek() == i32::from(b'0') {
            tok.push(self.ctx.get());
            match self.ctx.peek() {
                c if c == i32::from(b'x') || c == i32::from(b'X') => {
                    did_hex = true;
                    loop {
                        tok.push(self.ctx.get());
                        if !(self.ctx.peek() >= 0 && is_hex_(self.ctx.peek() as u8)) {
                            break;
                        }
                    }
                }
                c if c == i32::from(b'b') || c == i32::from(b'B') => loop {
                    tok.push(self.ctx.get());
                    if !(self.ctx.peek() >= 0 && is_bin_(self.ctx.peek() as u8)) {
                        break;
                    }
                },
                c if c >= i32::from(b'0') && c <= i32::from(b'9') => loop {
                    tok.push(self.ctx.get());
                    if !(self.ctx.peek() >= 0 && is_oct_(self.ctx.peek() as u8)) {
                        break;
                    }
                },
                _ => {}
            }
        } else {
            while self.ctx.peek() >= 0 && is_dec_(self.ctx.peek() as u8) {
                tok.push(self.ctx.get());
            }
        }

        // Fraction, unless it is the `..` range operator.
        if self.ctx.peek() == i32::from(b'.') && self.ctx.peek_at(1) != i32::from(b'.') {
            tok.push(self.ctx.get());
            is_float = true;
            if did_hex {
                while self.ctx.peek() >= 0 && is_hex_(self.ctx.peek() as u8) {
                    tok.push(self.ctx.get());
                }
            } else {
                while self.ctx.peek() >= 0 && is_dec_(self.ctx.peek() as u8) {
                    tok.push(self.ctx.get());
                }
            }
        }

        // Exponent: e/E/p/P with optional sign.
        let exp = self.ctx.peek();
        if exp == i32::from(b'e')
            || exp == i32::from(b'E')
            || exp == i32::from(b'p')
            || exp == i32::from(b'P')
        {
            is_float = true;
            tok.push(self.ctx.get());
            if self.ctx.peek() == i32::from(b'+') || self.ctx.peek() == i32::from(b'-') {
                tok.push(self.ctx.get());
            }
            while self.ctx.peek() >= 0 && is_dec_(self.ctx.peek() as u8) {
                tok.push(self.ctx.get());
            }
        }

        // Integer/float suffixes across all the languages.
        loop {
            let c = self.ctx.peek();
            let up = if c >= 0 {
                (c as u8).to_ascii_uppercase()
            } else {
                0
            };
            if up == b'I' || up == b'F' || up == b'D' || up == b'M' {
                is_float = true;
            } else if up != b'L' && up != b'U' {
                break;
            }
            tok.push(self.ctx.get());
        }

        // Microsoft's 64 suffix.
        if self.ctx.peek() == i32::from(b'6') && self.ctx.peek_at(1) == i32::from(b'4') {
            tok.push(self.ctx.get());
            tok.push(self.ctx.get());
        }

        tok.kind = if is_float {
            TokenKind::NumberFp
        } else {
            TokenKind::Number
        };

        self.parse_suffix(tok, false);
        true
    }

    /// Quoted strings; `quote_idx` is the number of prefix characters
    /// before the quote. `<...>` end matching is used for includes.
    fn parse_string(&mut self, tok: &mut TokBuf, quote_idx: usize, allow_escape: bool) -> bool {
        for _ in 0..quote_idx {
            tok.push(self.ctx.get());
        }

        tok.kind = TokenKind::Str;
        let quote = self.ctx.peek();
        let end_ch = if quote == i32::from(b'<') {
            i32::from(b'>')
        } else {
            quote
        };
        tok.push(self.ctx.get());

        let mut escaped = false;
        while self.ctx.more() {
            let ch = self.ctx.get();
            tok.push(ch);
            if ch == i32::from(b'\n') {
                tok.kind = TokenKind::StrMulti;
                escaped = false;
                continue;
            }
            if ch == i32::from(b'\r') && self.ctx.peek() != i32::from(b'\n') {
                tok.push(self.ctx.get());
                tok.kind = TokenKind::StrMulti;
                escaped = false;
                continue;
            }
            if !escaped {
                if allow_escape && ch == i32::from(b'\\') {
                    escaped = true;
                } else if ch == end_ch {
                    break;
                }
            } else {
                escaped = false;
            }
        }

        self.parse_suffix(tok, true);
        true
    }

    /// C# verbatim string: `@"..."`, doubled quotes escape.
    fn parse_cs_string(&mut self, tok: &mut TokBuf) -> bool {
        tok.push(self.ctx.get()); // '@'
        tok.push(self.ctx.get()); // '"'
        while self.ctx.more() {
            let ch = self.ctx.get();
            tok.push(ch);
            if ch == i32::from(b'"') {
                if self.ctx.peek() == i32::from(b'"') {
                    tok.push(self.ctx.get());
                } else {
                    break;
                }
            }
        }
        tok.kind = TokenKind::Str;
        true
    }

    /// C++11 raw string `R"tag( ... )tag"`, with any of the u8/u/U/L
    /// prefixes already counted into `q_idx`.
    fn parse_cr_string(&mut self, tok: &mut TokBuf, q_idx: usize) -> bool {
        self.ctx.save();

        for _ in 0..=q_idx {
            tok.push(self.ctx.get());
        }

        let mut tag: Vec<u8> = Vec::new();
        while self.ctx.more() && self.ctx.peek() != i32::from(b'(') {
            tag.push(self.ctx.peek() as u8);
            tok.push(self.ctx.get());
        }
        if self.ctx.peek() != i32::from(b'(') {
            self.ctx.restore();
            tok.text.clear();
            return false;
        }

        tok.kind = TokenKind::Str;
        while self.ctx.more() {
            if self.ctx.peek() == i32::from(b')') {
                let after = self.ctx.c.idx + 1;
                let end = after + tag.len();
                if self.data_matches(after, &tag) && self.byte_at(end) == Some(b'"') {
                    for _ in 0..tag.len() + 2 {
                        tok.push(self.ctx.get());
                    }
                    self.parse_suffix(tok, false);
                    return true;
                }
            }
            if self.ctx.peek() == i32::from(b'\n') {
                tok.kind = TokenKind::StrMulti;
            }
            tok.push(self.ctx.get());
        }
        self.ctx.restore();
        tok.text.clear();
        false
    }

    fn data_matches(&self, idx: usize, needle: &[u8]) -> bool {
        self.ctx
            .data
            .get(idx..idx + needle.len())
            .map(|s| s == needle)
            .unwrap_or(false)
    }

    fn byte_at(&self, idx: usize) -> Option<u8> {
        self.ctx.data.get(idx).copied()
    }

    /// All the D string forms, including the non-quoted escape runs.
    fn d_parse_string(&mut self, tok: &mut TokBuf) -> bool {
        let ch = self.ctx.peek();
        if ch == i32::from(b'"') || ch == i32::from(b'\'') || ch == i32::from(b'`') {
            return self.parse_string(tok, 0, ch != i32::from(b'`'));
        }
        if ch == i32::from(b'\\') {
            self.ctx.save();
            tok.text.clear();
            while self.ctx.peek() == i32::from(b'\\') {
                tok.push(self.ctx.get());
                match self.ctx.peek() {
                    c if c == i32::from(b'x') => {
                        for _ in 0..3 {
                            tok.push(self.ctx.get());
                        }
                    }
                    c if c == i32::from(b'u') => {
                        for _ in 0..5 {
                            tok.push(self.ctx.get());
                        }
                    }
                    c if c == i32::from(b'U') => {
                        for _ in 0..9 {
                            tok.push(self.ctx.get());
                        }
                    }
                    c if c >= i32::from(b'0') && c <= i32::from(b'7') => {
                        for _ in 0..3 {
                            let d = self.ctx.peek();
                            if d >= i32::from(b'0') && d <= i32::from(b'7') {
                                tok.push(self.ctx.get());
                            } else {
                                break;
                            }
                        }
                    }
                    c if c == i32::from(b'&') => {
                        tok.push(self.ctx.get());
                        while self.ctx.peek() >= 0
                            && (self.ctx.peek() as u8).is_ascii_alphabetic()
                        {
                            tok.push(self.ctx.get());
                        }
                        if self.ctx.peek() == i32::from(b';') {
                            tok.push(self.ctx.get());
                        }
                    }
                    _ => tok.push(self.ctx.get()),
                }
            }
            if tok.text.len() > 1 {
                tok.kind = TokenKind::Str;
                return true;
            }
            self.ctx.restore();
            tok.text.clear();
            return false;
        }
        if (ch == i32::from(b'r') || ch == i32::from(b'x')) && self.ctx.peek_at(1) == i32::from(b'"')
        {
            return self.parse_string(tok, 1, false);
        }
        false
    }

    fn parse_word(
        &mut self,
        tok: &mut TokBuf,
        mut skipcheck: bool,
        in_preproc: TokenKind,
        preproc_ncnl_count: u32,
    ) -> bool {
        tok.text.clear();
        tok.push(self.ctx.get());

        while self.ctx.more() && is_kw2(self.ctx.peek() as u8) {
            let ch = self.ctx.get();
            tok.push(ch);
            // Non-ASCII identifiers never match the keyword table.
            if ch > 0x7f {
                skipcheck = true;
            }
        }
        tok.kind = TokenKind::Word;

        if skipcheck {
            return true;
        }

        if in_preproc == TokenKind::PpDefine && preproc_ncnl_count == 1 {
            tok.kind = if self.ctx.peek() == i32::from(b'(') {
                TokenKind::MacroFunc
            } else {
                TokenKind::Macro
            };
            return true;
        }

        if self.lang & LANG_JAVA != 0
            && tok.text.first() == Some(&b'@')
            && tok.text.as_slice() != b"@interface"
        {
            tok.kind = TokenKind::Annotation;
            return true;
        }

        let pp = match in_preproc {
            TokenKind::None => PpPos::None,
            TokenKind::Preproc => PpPos::DirectiveName,
            TokenKind::PpIf | TokenKind::PpElse => PpPos::InIf,
            _ => PpPos::InOther,
        };
        if let Ok(word) = std::str::from_utf8(&tok.text) {
            tok.kind = find_keyword(word, pp, self.lang);
            if tok.kind != TokenKind::Word {
                tok.flags |= ChunkFlags::KEYWORD;
            }
        }
        true
    }

    /// One token. Returns false only at end of input.
    fn parse_next(
        &mut self,
        tok: &mut TokBuf,
        in_preproc: TokenKind,
        preproc_ncnl_count: u32,
        last_kind: TokenKind,
    ) -> bool {
        if !self.ctx.more() {
            return false;
        }
        tok.line = self.ctx.c.row;
        tok.col = self.ctx.c.col;
        tok.kind = TokenKind::None;
        tok.flags = ChunkFlags::NONE;
        tok.text.clear();

        if self.parse_whitespace(tok) {
            return true;
        }

        // Unknown/unstructured directives swallow their body whole.
        if in_preproc.pp_takes_raw_body() {
            let mut last = 0i32;
            let mut mark = self.ctx.mark();
            tok.kind = TokenKind::PreprocBody;
            while self.ctx.more() {
                let ch = self.ctx.peek();
                if ch == i32::from(b'\n') || ch == i32::from(b'\r') {
                    // Escaped newline: hand the backslash back so the
                    // NL_CONT parser sees it.
                    if last == i32::from(b'\\') {
                        self.ctx.rewind(mark);
                        tok.text.pop();
                    }
                    break;
                }
                if ch == i32::from(b'/') && self.ctx.peek_at(1) == i32::from(b'/') {
                    break;
                }
                last = ch;
                mark = self.ctx.mark();
                tok.push(self.ctx.get());
            }
            if !tok.text.is_empty() {
                return true;
            }
        }

        if self.ctx.peek() == i32::from(b'\\') && self.parse_bs_newline(tok) {
            return true;
        }

        if self.parse_comment(tok) {
            return true;
        }

        // C# verbatim strings and verbatim identifiers.
        if self.lang & LANG_CS != 0 && self.ctx.peek() == i32::from(b'@') {
            if self.ctx.peek_at(1) == i32::from(b'"') {
                return self.parse_cs_string(tok);
            }
            if self.ctx.peek_at(1) >= 0 && is_kw1(self.ctx.peek_at(1) as u8) {
                return self.parse_word(tok, true, in_preproc, preproc_ncnl_count);
            }
        }

        // C++0x u8/u/U/R string prefixes.
        let ch = self.ctx.peek();
        if self.lang & LANG_CPP != 0
            && (ch == i32::from(b'u') || ch == i32::from(b'U') || ch == i32::from(b'R'))
        {
            let mut idx = 0usize;
            let mut is_raw = false;
            if ch == i32::from(b'u') && self.ctx.peek_at(1) == i32::from(b'8') {
                idx = 2;
            } else if ch == i32::from(b'u') || ch == i32::from(b'U') {
                idx = 1;
            }
            if self.ctx.peek_at(idx) == i32::from(b'R') {
                idx += 1;
                is_raw = true;
            }
            if self.ctx.peek_at(idx) == i32::from(b'"') {
                if is_raw {
                    if self.parse_cr_string(tok, idx) {
                        return true;
                    }
                } else if self.parse_string(tok, idx, true) {
                    return true;
                }
            }
        }

        // Pawn strings: \"..", !"..", !\"..", \!"..".
        if self.lang & LANG_PAWN != 0
            && (self.ctx.peek() == i32::from(b'\\') || self.ctx.peek() == i32::from(b'!'))
        {
            if self.ctx.peek_at(1) == i32::from(b'"') {
                return self.parse_string(tok, 1, self.ctx.peek() == i32::from(b'!'));
            }
            if (self.ctx.peek_at(1) == i32::from(b'\\') || self.ctx.peek_at(1) == i32::from(b'!'))
                && self.ctx.peek_at(2) == i32::from(b'"')
            {
                return self.parse_string(tok, 2, false);
            }
        }

        if self.parse_number(tok) {
            return true;
        }

        if self.lang & LANG_D != 0 {
            if self.d_parse_string(tok) {
                return true;
            }
        } else {
            let ch = self.ctx.peek();
            let ch1 = self.ctx.peek_at(1);
            if ((ch == i32::from(b'L') || ch == i32::from(b'S'))
                && (ch1 == i32::from(b'"') || ch1 == i32::from(b'\'')))
                || ch == i32::from(b'"')
                || ch == i32::from(b'\'')
                || (ch == i32::from(b'<') && in_preproc == TokenKind::PpInclude)
            {
                let prefix = if ch >= 0 && (ch as u8).is_ascii_alphabetic() {
                    1
                } else {
                    0
                };
                return self.parse_string(tok, prefix, true);
            }
            if ch == i32::from(b'<')
                && in_preproc == TokenKind::PpDefine
                && last_kind == TokenKind::Macro
            {
                // "#define XXX <...>": treat the angle part as an
                // include string.
                return self.parse_string(tok, 0, false);
            }
        }

        // Objective-C literals.
        if self.lang & LANG_OC != 0 && self.ctx.peek() == i32::from(b'@') {
            let nc = self.ctx.peek_at(1);
            if nc == i32::from(b'"') || nc == i32::from(b'\'') {
                return self.parse_string(tok, 1, true);
            }
            if nc >= i32::from(b'0') && nc <= i32::from(b'9') {
                tok.push(self.ctx.get());
                return self.parse_number(tok);
            }
        }

        if (self.ctx.peek() >= 0 && is_kw1(self.ctx.peek() as u8))
            || (self.ctx.peek() == i32::from(b'@')
                && self.ctx.peek_at(1) >= 0
                && is_kw1(self.ctx.peek_at(1) as u8))
        {
            return self.parse_word(tok, false, in_preproc, preproc_ncnl_count);
        }

        let window_end = (self.ctx.c.idx + 4).min(self.ctx.data.len());
        if let Some(punc) = find_punctuator(&self.ctx.data[self.ctx.c.idx..window_end], self.lang)
        {
            for _ in 0..punc.tag.len() {
                tok.push(self.ctx.get());
            }
            tok.kind = punc.kind;
            tok.flags |= ChunkFlags::PUNCTUATOR;
            return true;
        }

        // Throw the byte away but keep going.
        tok.kind = TokenKind::Unknown;
        tok.push(self.ctx.get());
        warn!(
            "{}:{} garbage in col {}: {:#04x}",
            self.filename, tok.line, tok.col, tok.text[0]
        );
        true
    }
}

/// Tokenizes the whole buffer into `list`, tracking the preprocessor
/// state machine and inheriting copy flags from chunk to chunk.
pub fn tokenize(
    data: &[u8],
    lang: LangMask,
    tab_size: u32,
    filename: &str,
    list: &mut ChunkList,
) -> Result<()> {
    let mut lexer = Lexer {
        ctx: TokCtx::new(data, tab_size.max(1)),
        lang,
        filename,
    };
    let mut in_preproc = TokenKind::None;
    let mut preproc_ncnl_count: u32 = 0;

    while lexer.ctx.more() {
        let start_idx = lexer.ctx.c.idx;
        let mut tok = TokBuf::new();
        if !lexer.parse_next(&mut tok, in_preproc, preproc_ncnl_count, tail_kind(list)) {
            break;
        }
        if lexer.ctx.c.idx == start_idx {
            // parse_next always consumes at least one byte; a stuck
            // cursor would loop forever, so treat it as fatal.
            return Err(IndexerError::Parse {
                file: filename.to_string(),
                line: lexer.ctx.c.row,
                message: "tokenizer made no progress".to_string(),
            });
        }

        if tok.kind == TokenKind::Whitespace {
            continue;
        }
        if tok.kind == TokenKind::NlCont {
            tok.text = b"\\\n".to_vec();
        }

        // Trailing blanks belong to the dropped-whitespace pool.
        while tok.text.last().map(|&b| is_blank(b)).unwrap_or(false) {
            tok.text.pop();
        }

        let mut chunk = Chunk::new(
            tok.kind,
            String::from_utf8_lossy(&tok.text).into_owned(),
            tok.line,
            tok.col,
        );
        chunk.col_end = lexer.ctx.c.col;
        chunk.flags = tok.flags;

        // Copy-partition inheritance from the previous chunk.
        if let Some(tail) = list.tail() {
            chunk.flags |= list.flags(tail).copy_part();
        }
        if chunk.kind == TokenKind::Newline {
            chunk.flags = chunk.flags - ChunkFlags::IN_PREPROC;
        }

        let id = list.push(chunk);

        if list.kind(id) == TokenKind::Newline {
            in_preproc = TokenKind::None;
            preproc_ncnl_count = 0;
        }

        if in_preproc != TokenKind::None {
            list.add_flags(id, ChunkFlags::IN_PREPROC);
            if !list.is_newline(id) {
                preproc_ncnl_count += 1;
            }
            if in_preproc == TokenKind::Preproc {
                // The word right after '#' picks the directive kind.
                if !list.kind(id).is_pp_directive() {
                    list.set_kind(id, TokenKind::PpOther);
                }
                in_preproc = list.kind(id);
            }
        } else if list.kind(id) == TokenKind::Pound {
            let at_line_start = match list.prev(id, Nav::All) {
                None => true,
                Some(p) => list.kind(p) == TokenKind::Newline,
            };
            if at_line_start {
                list.set_kind(id, TokenKind::Preproc);
                list.add_flags(id, ChunkFlags::IN_PREPROC);
                in_preproc = TokenKind::Preproc;
            }
        }
    }
    Ok(())
}

fn tail_kind(list: &ChunkList) -> TokenKind {
    list.tail().map(|t| list.kind(t)).unwrap_or(TokenKind::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{LANG_C, LANG_CPP, LANG_D};

    fn lex(src: &str, lang: LangMask) -> ChunkList {
        let mut list = ChunkList::new();
        tokenize(src.as_bytes(), lang, 8, "test", &mut list).unwrap();
        list
    }

    fn kinds(list: &ChunkList) -> Vec<TokenKind> {
        list.iter().map(|id| list.kind(id)).collect()
    }

    #[test]
    fn words_numbers_punctuators() {
        let list = lex("int x = 42;", LANG_C);
        assert_eq!(
            kinds(&list),
            vec![
                TokenKind::Type,
                TokenKind::Word,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn float_forms() {
        let list = lex("1.5 0x1F 0b1010 1e-3 .5f 100_000 077", LANG_D);
        let k = kinds(&list);
        assert_eq!(
            k,
            vec![
                TokenKind::NumberFp,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::NumberFp,
                TokenKind::NumberFp,
                TokenKind::Number,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        let list = lex("a /* b */ c // d\ne", LANG_C);
        let texts: Vec<_> = list
            .iter()
            .filter(|&id| !list.is_newline(id))
            .map(|id| list.text(id).to_string())
            .collect();
        assert_eq!(texts, vec!["a", "c", "e"]);
    }

    #[test]
    fn nestable_d_comments() {
        let list = lex("a /+ x /+ y +/ z +/ b", LANG_D);
        let texts: Vec<_> = list.iter().map(|id| list.text(id).to_string()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn raw_string_stops_at_matching_tag() {
        let list = lex("R\"xx(a)\" )xx\" tail", LANG_CPP | LANG_C);
        let first = list.head().unwrap();
        assert_eq!(list.kind(first), TokenKind::Str);
        assert_eq!(list.text(first), "R\"xx(a)\" )xx\"");
    }

    #[test]
    fn multiline_string_retagged() {
        let list = lex("\"a\nb\"", LANG_C);
        assert_eq!(list.kind(list.head().unwrap()), TokenKind::StrMulti);
    }

    #[test]
    fn preproc_define_detects_macro_func() {
        let list = lex("#define MAX(a,b) ((a)>(b))\n#define N 10\n", LANG_C);
        let all: Vec<_> = list
            .iter()
            .map(|id| (list.kind(id), list.text(id).to_string()))
            .collect();
        assert!(all.contains(&(TokenKind::MacroFunc, "MAX".to_string())));
        assert!(all.contains(&(TokenKind::Macro, "N".to_string())));
        assert!(all.contains(&(TokenKind::PpDefine, "define".to_string())));
    }

    #[test]
    fn include_angle_string() {
        let list = lex("#include <stdio.h>\n", LANG_C);
        let all: Vec<_> = list
            .iter()
            .map(|id| (list.kind(id), list.text(id).to_string()))
            .collect();
        assert!(all.contains(&(TokenKind::Str, "<stdio.h>".to_string())));
    }

    #[test]
    fn in_preproc_clears_on_newline() {
        let list = lex("#define A 1\nint b;\n", LANG_C);
        for id in list.iter() {
            let in_pp = list.flags(id).contains(ChunkFlags::IN_PREPROC);
            if list.text(id) == "b" || list.text(id) == "int" {
                assert!(!in_pp);
            }
            if list.text(id) == "A" {
                assert!(in_pp);
            }
        }
    }

    #[test]
    fn garbage_byte_becomes_unknown() {
        let list = lex("a ` b", LANG_C);
        assert!(kinds(&list).contains(&TokenKind::Unknown));
    }

    #[test]
    fn non_utf8_bytes_do_not_poison_chunks() {
        let mut list = ChunkList::new();
        let data = [b'a', b' ', 0xFF, 0xFE, b' ', b'b'];
        tokenize(&data, LANG_C, 8, "test", &mut list).unwrap();
        // The garbage bytes become identifier-ish chunks with lossy
        // text; nothing panics and the words survive.
        let texts: Vec<_> = list.iter().map(|id| list.text(id).to_string()).collect();
        assert!(texts.contains(&"a".to_string()));
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn pri_suffix_rolls_back() {
        let list = lex("\"fmt %\"PRIx32 \"x\"", LANG_C);
        let texts: Vec<_> = list.iter().map(|id| list.text(id).to_string()).collect();
        // PRIx32 stays its own word instead of gluing onto the string.
        assert!(texts.contains(&"PRIx32".to_string()));
        assert!(texts.contains(&"\"fmt %\"".to_string()));
    }

    #[test]
    fn columns_account_for_tabs_and_utf8() {
        let list = lex("\tx", LANG_C);
        let x = list.head().unwrap();
        assert_eq!(list.get(x).col, 9);

        let list = lex("\u{00e9}tat x", LANG_C);
        let first = list.head().unwrap();
        // é is two bytes but one column
        assert_eq!(list.get(first).col_end, 5);
    }
}
