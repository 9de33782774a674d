//! End-to-end pipeline scenarios: literal source in, emitted records
//! out, in the `FILE:LINE:COL SCOPE KIND SUB NAME` text form.

use cindex::analyzer::{analyze_bytes, parse_chunks};
use cindex::lang::{LangMask, LANG_C, LANG_CPP, LANG_OC};
use cindex::token::ChunkFlags;
use cindex::TokenKind;

fn lines(src: &str, lang: LangMask) -> Vec<String> {
    analyze_bytes(src.as_bytes(), lang, 8, "FILE")
        .expect("analysis failed")
        .records
        .iter()
        .map(|r| r.format("FILE"))
        .collect()
}

fn assert_has(lines: &[String], needle: &str) {
    assert!(
        lines.iter().any(|l| l == needle),
        "missing {:?} in:\n{}",
        needle,
        lines.join("\n")
    );
}

// ============================================================================
// Spec scenarios
// ============================================================================

#[test]
fn function_declaration_at_global_scope() {
    let out = lines("int print_event_filter(void);\n", LANG_C);
    assert_has(&out, "FILE:1:5 <global> FUNCTION DECL print_event_filter");
}

#[test]
fn function_definition_at_global_scope() {
    let out = lines("int print_event_filter(void)\n{\n    return 0;\n}\n", LANG_C);
    assert_has(&out, "FILE:1:5 <global> FUNCTION DEF print_event_filter");
}

#[test]
fn call_inside_function_body_scope() {
    let src = "static void event_filter_read(void)\n{\n    int x = print_event_filter();\n}\n";
    let out = lines(src, LANG_C);
    assert_has(
        &out,
        "FILE:3:13 event_filter_read{} FUNCTION REF print_event_filter",
    );
    assert_has(&out, "FILE:3:9 event_filter_read{} VAR DEF x");
}

#[test]
fn typedef_struct_with_body_and_alias() {
    let out = lines("typedef struct foo { int a; } foo_t;\n", LANG_C);
    assert_has(&out, "FILE:1:16 <global> STRUCT DEF foo");
    assert_has(&out, "FILE:1:26 foo VAR DEF a");
    assert_has(&out, "FILE:1:31 <global> STRUCT_TYPE DEF foo_t");
}

#[test]
fn namespace_class_method_scopes() {
    let src = "namespace N { class C { void m(); }; } void N::C::m() {}\n";
    let out = lines(src, LANG_CPP | LANG_C);
    assert_has(&out, "FILE:1:11 <global> NAMESPACE DEF N");
    assert_has(&out, "FILE:1:21 N CLASS DEF C");
    assert_has(&out, "FILE:1:30 N:C() FUNCTION DECL m");
    assert_has(&out, "FILE:1:51 N:C{} FUNCTION DEF m");
}

#[test]
fn macro_function_and_preproc_identifiers() {
    let out = lines("#define MAX(a,b) ((a)>(b)?(a):(b))\n", LANG_C);
    assert_has(&out, "FILE:1:9 <preproc> MACRO_FUNCTION DEF MAX");
    assert!(out
        .iter()
        .any(|l| l.ends_with("<preproc> IDENTIFIER REF a")));
    assert!(out
        .iter()
        .any(|l| l.ends_with("<preproc> IDENTIFIER REF b")));
}

// ============================================================================
// Behaviors from the original test corpus
// ============================================================================

#[test]
fn extern_prototype_is_declaration() {
    let out = lines("extern int functionb(int a, int b);\n", LANG_C);
    assert!(out
        .iter()
        .any(|l| l.contains("FUNCTION DECL functionb")));
}

#[test]
fn static_definition_followed_by_use() {
    let src = "static int functionc(int a, int b);\n\nstatic int functionc(int a, int b)\n{\n    return a + b;\n}\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("FUNCTION DECL functionc")));
    assert!(out.iter().any(|l| l.contains("FUNCTION DEF functionc")));
}

#[test]
fn enum_proto_def_and_refs() {
    let src = "enum enua;\n\nenum enua\n{\n    ENUA_A,\n    ENUA_B,\n};\n\ntypedef enum enua enua;\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("ENUM DECL enua")));
    assert!(out.iter().any(|l| l.contains("ENUM DEF enua")));
    assert!(out.iter().any(|l| l.contains("ENUM REF enua")));
    assert!(out.iter().any(|l| l.contains("enua ENUM_VAL DEF ENUA_A")));
    assert!(out.iter().any(|l| l.contains("ENUM_TYPE DEF enua")));
}

#[test]
fn anonymous_enum_typedef() {
    let src = "typedef enum\n{\n    ENUB_A,\n    ENUB_B,\n} enub;\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("ENUM_TYPE DEF enub")));
    assert!(out.iter().any(|l| l.contains("ENUM_VAL DEF ENUB_A")));
}

#[test]
fn enum_variable_reference_in_body() {
    let src = "enum enua { ENUA_A };\nvoid fn(void)\n{\n    enum enua a1;\n}\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("fn{} ENUM REF enua")));
    assert!(out.iter().any(|l| l.contains("fn{} VAR DEF a1")));
}

#[test]
fn union_and_struct_variables() {
    let src = "union u { int a; char b; } instance;\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("UNION DEF u")));
    assert!(out.iter().any(|l| l.contains("u VAR DEF a")));
    assert!(out.iter().any(|l| l.contains("VAR DEF instance")));
}

#[test]
fn function_pointer_variable() {
    let src = "void (*handler)(int sig);\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("VAR DEF handler")), "{out:?}");
}

#[test]
fn function_typedef() {
    let src = "typedef void (*callback_t)(int x);\n";
    let out = lines(src, LANG_C);
    assert!(
        out.iter().any(|l| l.contains("FUNCTION_TYPE DEF callback_t")),
        "{out:?}"
    );
}

#[test]
fn extern_variable_is_declaration() {
    let out = lines("extern int debug_level;\n", LANG_C);
    assert!(out.iter().any(|l| l.contains("VAR DECL debug_level")));
}

#[test]
fn multiple_declarators_per_statement() {
    let out = lines("int a, b, c;\n", LANG_C);
    assert!(out.iter().any(|l| l.contains("VAR DEF a")));
    assert!(out.iter().any(|l| l.contains("VAR DEF b")));
    assert!(out.iter().any(|l| l.contains("VAR DEF c")));
}

#[test]
fn definitions_split_by_preproc_conditional() {
    let src = "#if defined(DEFINE)\nint functionh(int a, int b, int c)\n#else\nint functionh(int a, int c)\n#endif\n{\n    return a;\n}\n";
    let out = lines(src, LANG_C);
    // Both arms contribute a definition record.
    let defs = out
        .iter()
        .filter(|l| l.contains("FUNCTION DEF functionh"))
        .count();
    assert_eq!(defs, 2, "{out:?}");
}

#[test]
fn cast_is_not_a_call() {
    let src = "void f(void)\n{\n    int x = (foo_t)y;\n}\n";
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("TYPE REF foo_t")), "{out:?}");
    assert!(!out.iter().any(|l| l.contains("FUNCTION") && l.contains("foo_t")));
}

#[test]
fn label_and_goto() {
    let src = "void f(void)\n{\n    goto done;\ndone:\n    return;\n}\n";
    let out = lines(src, LANG_C);
    // 'done' after goto is a plain identifier reference; the label
    // itself is not an emitted kind.
    assert!(out.iter().any(|l| l.contains("IDENTIFIER REF done")));
}

#[test]
fn cpp_class_constructor_and_method() {
    let src = "class Widget {\npublic:\n    Widget();\n    void draw();\n};\nWidget::Widget() {}\n";
    let out = lines(src, LANG_CPP | LANG_C);
    assert!(out.iter().any(|l| l.contains("CLASS DEF Widget")));
    assert!(out.iter().any(|l| l.contains("FUNCTION DECL draw")));
    // in-class ctor declaration plus the out-of-line definition
    assert!(out.iter().any(|l| l.contains("FUNCTION DECL Widget")), "{out:?}");
    assert!(out.iter().any(|l| l.contains("FUNCTION DEF Widget")), "{out:?}");
}

#[test]
fn objc_interface_and_message() {
    let src = "@interface Foo : Bar\n@end\n";
    let out = lines(src, LANG_OC | LANG_C);
    // The class name after @interface survives as a type-ish ref.
    assert!(out.iter().any(|l| l.contains("Foo")), "{out:?}");
}

// ============================================================================
// Pinned quirks (kept deliberately; see DESIGN.md)
// ============================================================================

#[test]
fn function_type_args_keep_call_flag() {
    // A constructor's argument region is tagged as if it were a call
    // region. Retained from the original; pinned so nothing starts to
    // depend on it being "fixed".
    let src = "class C { C(int x); };\n";
    let list = parse_chunks(src.as_bytes(), LANG_CPP | LANG_C, 8, "t").unwrap();
    let x = list
        .iter()
        .find(|&id| list.text(id) == "x")
        .expect("x not found");
    assert!(list.flags(x).contains(ChunkFlags::IN_FCN_CALL));
}

#[test]
fn tokenizer_never_bails_before_end() {
    // The original logged a "bailed before the end?" warning on a path
    // that cannot trigger: every dispatch consumes at least one byte.
    // The rewrite treats that path as fatal; arbitrary garbage must
    // still analyze cleanly.
    let garbage: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    assert!(analyze_bytes(&garbage, LANG_C, 8, "garbage").is_ok());
}

#[test]
fn virtual_braces_do_not_emit() {
    let src = "void f(void)\n{\n    if (a)\n        b();\n}\n";
    let list = parse_chunks(src.as_bytes(), LANG_C, 8, "t").unwrap();
    assert!(list
        .iter()
        .any(|id| list.kind(id) == TokenKind::VBraceOpen));
    let out = lines(src, LANG_C);
    assert!(out.iter().any(|l| l.contains("f{} FUNCTION REF b")), "{out:?}");
}
