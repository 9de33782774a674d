//! Universal pipeline invariants: these hold for every input.

use cindex::analyzer::{analyze_bytes, parse_chunks};
use cindex::lang::{LangMask, LANG_C, LANG_CPP, LANG_D};
use cindex::token::ChunkFlags;
use cindex::{ChunkList, TokenKind};

const SAMPLES: &[(&str, &str)] = &[
    ("simple", "int a = 1;\nvoid f(void) { a++; }\n"),
    (
        "preproc",
        "#define N 10\n#if N > 5\nint big;\n#else\nint small;\n#endif\n",
    ),
    (
        "control",
        "void f(int n)\n{\n    if (n) g();\n    else h();\n    for (;;) break;\n    do { n--; } while (n);\n}\n",
    ),
    (
        "strings",
        "const char *s = \"a)b\";\nchar c = 'x';\nint n = 0x1F;\n",
    ),
    (
        "types",
        "typedef struct foo { int a; } foo_t;\nstruct foo instance;\n",
    ),
];

fn parse(src: &str, lang: LangMask) -> ChunkList {
    parse_chunks(src.as_bytes(), lang, 8, "inv").expect("pipeline failed")
}

/// Whitespace-class bytes dropped by the lexer.
fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

#[test]
fn token_completeness() {
    // Concatenated chunk text equals the input, modulo dropped
    // whitespace (comments are whitespace-class).
    for (name, src) in SAMPLES {
        let list = parse(src, LANG_C);
        let mut collected = String::new();
        for id in list.iter() {
            collected.push_str(list.text(id));
        }
        assert_eq!(squash(&collected), squash(src), "sample {name}");
    }
}

#[test]
fn bracket_pairing_and_levels() {
    for (name, src) in SAMPLES {
        let list = parse(src, LANG_C);
        let mut stack: Vec<(TokenKind, i32)> = Vec::new();
        for id in list.iter() {
            let kind = list.kind(id);
            let level = list.get(id).level;
            if kind.is_open() {
                stack.push((kind, level));
            } else if kind.is_close() {
                let (open, open_level) = stack
                    .pop()
                    .unwrap_or_else(|| panic!("sample {name}: unmatched close {kind:?}"));
                assert_eq!(open.matching_close(), Some(kind), "sample {name}");
                assert_eq!(open_level, level, "sample {name}");
            } else if let Some((_, open_level)) = stack.last() {
                assert!(
                    level > *open_level,
                    "sample {name}: inner chunk at level {level} not deeper than {open_level}"
                );
            }
        }
        assert!(stack.is_empty(), "sample {name}: residual opens {stack:?}");
    }
}

#[test]
fn preproc_flag_clears_only_at_newline() {
    for (name, src) in SAMPLES {
        let list = parse(src, LANG_C);
        let ids: Vec<_> = list.iter().collect();
        for pair in ids.windows(2) {
            let a = pair[0];
            let b = pair[1];
            if list.flags(a).contains(ChunkFlags::IN_PREPROC)
                && !list.flags(b).contains(ChunkFlags::IN_PREPROC)
            {
                assert!(
                    matches!(list.kind(b), TokenKind::Newline | TokenKind::NlCont),
                    "sample {name}: preproc region ended without a newline"
                );
            }
        }
    }
}

#[test]
fn scope_paths_are_well_formed() {
    let src = "namespace N { class C { void m() { int x; } }; }\nstatic int s;\n#define M 1\n";
    let out = analyze_bytes(src.as_bytes(), LANG_CPP | LANG_C, 8, "t").unwrap();
    for r in &out.records {
        assert!(!r.scope.is_empty(), "empty scope for {}", r.name);
        assert!(!r.scope.contains("::"), "double colon in {}", r.scope);
        let special = matches!(r.scope.as_str(), "<global>" | "<local>" | "<preproc>");
        if !special {
            assert!(
                r.scope
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric()
                        || matches!(c, '_' | ':' | '~' | '(' | ')' | '$' | '{' | '}')),
                "bad scope {:?}",
                r.scope
            );
        }
    }
}

#[test]
fn emission_order_is_nondecreasing() {
    for (name, src) in SAMPLES {
        let out = analyze_bytes(src.as_bytes(), LANG_C, 8, "t").unwrap();
        let mut last = (0u32, 0u32);
        for r in &out.records {
            assert!(
                (r.line, r.column) >= last,
                "sample {name}: record order broken at {}",
                r.name
            );
            last = (r.line, r.column);
        }
    }
}

#[test]
fn reanalysis_is_byte_identical() {
    for (name, src) in SAMPLES {
        let a = analyze_bytes(src.as_bytes(), LANG_C, 8, "t").unwrap();
        let b = analyze_bytes(src.as_bytes(), LANG_C, 8, "t").unwrap();
        let fa: Vec<_> = a.records.iter().map(|r| r.format("t")).collect();
        let fb: Vec<_> = b.records.iter().map(|r| r.format("t")).collect();
        assert_eq!(fa, fb, "sample {name}");
    }
}

#[test]
fn nestable_d_comments_consume_matching_pairs() {
    let src = "int before; /+ one /+ two +/ still +/ int after;\n";
    let list = parse(src, LANG_D);
    let texts: Vec<_> = list
        .iter()
        .filter(|&id| !list.is_newline(id))
        .map(|id| list.text(id).to_string())
        .collect();
    assert_eq!(texts, vec!["int", "before", ";", "int", "after", ";"]);
}

#[test]
fn raw_string_terminates_on_matching_tag_only() {
    let src = "const char *s = R\"tag(body with ) and \" inside)tag\";\n";
    let list = parse(src, LANG_CPP | LANG_C);
    let raw = list
        .iter()
        .find(|&id| matches!(list.kind(id), TokenKind::Str | TokenKind::StrMulti))
        .expect("no string chunk");
    assert_eq!(list.text(raw), "R\"tag(body with ) and \" inside)tag\"");
}

#[test]
fn unterminated_string_at_eof_is_not_fatal() {
    let src = "int a;\nconst char *s = \"oops\n";
    assert!(analyze_bytes(src.as_bytes(), LANG_C, 8, "t").is_ok());
}

#[test]
fn vbrace_levels_account_like_real_braces() {
    let src = "void f(void)\n{\n    if (a)\n        if (b)\n            g();\n}\n";
    let list = parse(src, LANG_C);
    let g = list.iter().find(|&id| list.text(id) == "g").unwrap();
    assert_eq!(list.get(g).brace_level, 3);
    // vbrace opens and closes balance
    let mut depth = 0i32;
    for id in list.iter() {
        match list.kind(id) {
            TokenKind::VBraceOpen => depth += 1,
            TokenKind::VBraceClose => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);
}
