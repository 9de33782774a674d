//! Token kinds, chunk flags, and emitted identifier categories.
//!
//! The kind set is closed. Paired bracket kinds are laid out so that
//! every `*Open` is immediately followed by its `*Close`; the matcher
//! never relies on that layout directly, it asks [`TokenKind::is_open`]
//! and derives the partner through [`TokenKind::matching_close`] /
//! [`TokenKind::matching_open`]. A unit test pins the adjacency so the
//! enum cannot drift.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    None,
    Unknown,
    Whitespace,
    Newline,
    NlCont,

    // Literals
    Number,
    NumberFp,
    Str,
    StrMulti,

    // Identifier-ish
    Word,
    Type,
    Macro,
    MacroFunc,
    Annotation,
    Label,
    Tag,

    // Operators
    Assign,
    Arith,
    BoolOp,
    Compare,
    Caret,
    Deref,
    Addr,
    Neg,
    Pos,
    Star,
    Amp,
    Plus,
    Minus,
    Not,
    Inv,
    IncdecAfter,
    IncdecBefore,
    Member,
    DcMember,
    Ellipsis,
    Question,
    Pound,
    PtrType,
    Byref,

    // Colon family
    Colon,
    CondColon,
    CaseColon,
    LabelColon,
    ClassColon,
    BitColon,
    TagColon,
    DArrayColon,
    ForColon,
    OcDictColon,
    OcColon,
    ConstrColon,

    Semicolon,
    VSemicolon,
    Comma,

    // Paired brackets. Close kind == open kind + 1, always.
    ParenOpen,
    ParenClose,
    SParenOpen,
    SParenClose,
    FParenOpen,
    FParenClose,
    TParenOpen,
    TParenClose,
    BraceOpen,
    BraceClose,
    VBraceOpen,
    VBraceClose,
    AngleOpen,
    AngleClose,
    SquareOpen,
    SquareClose,
    TSquare,

    // Keywords & statement structure
    If,
    Else,
    ElseIf,
    For,
    While,
    WhileOfDo,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Throw,
    Try,
    Catch,
    Finally,
    Qualifier,
    Typename,
    Struct,
    Union,
    Enum,
    EnumClass,
    Class,
    Namespace,
    Typedef,
    Template,
    Operator,
    OperatorVal,
    Private,
    Sizeof,
    Delete,
    New,
    Using,
    Friend,
    Extern,
    This,
    Base,
    Assert,
    Import,
    State,

    // Function classification
    Function,
    FuncCall,
    FuncCallUser,
    FuncDef,
    FuncProto,
    FuncClass,
    FuncCtorVar,
    FuncVar,
    FuncType,
    FuncWrap,
    ProtoWrap,
    TypeWrap,
    Destructor,

    // Casts
    CppCast,
    CCast,
    DCast,
    TypeCast,

    Attribute,
    C99Member,
    MacroOpen,
    MacroElse,
    MacroClose,
    SqlExec,
    SqlBegin,
    SqlEnd,
    CppLambda,
    CppLambdaRet,

    // D
    DTemplate,
    Delegate,
    Align,
    Invariant,
    DVersion,

    // Objective-C
    OcAt,
    OcEnd,
    OcClass,
    OcProtocol,
    OcMsg,
    OcMsgDecl,
    OcMsgSpec,
    OcScope,
    OcBlockCaret,
    OcBlockExpr,
    OcBlockType,
    OcBlockArg,
    OcProtoList,
    OcProperty,
    OcSel,
    OcRtype,

    // C#
    Getset,
    GetsetEmpty,
    CsProperty,
    CsSqStmt,

    // Preprocessor
    Preproc,
    PreprocBody,
    PpDefine,
    PpDefined,
    PpInclude,
    PpIf,
    PpElse,
    PpEndif,
    PpUndef,
    PpPragma,
    PpLine,
    PpError,
    PpWarning,
    PpRegion,
    PpOther,
}

impl TokenKind {
    /// True for every bracket-opening kind the matcher understands.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TokenKind::ParenOpen
                | TokenKind::SParenOpen
                | TokenKind::FParenOpen
                | TokenKind::TParenOpen
                | TokenKind::BraceOpen
                | TokenKind::VBraceOpen
                | TokenKind::AngleOpen
                | TokenKind::SquareOpen
        )
    }

    pub fn is_close(self) -> bool {
        matches!(
            self,
            TokenKind::ParenClose
                | TokenKind::SParenClose
                | TokenKind::FParenClose
                | TokenKind::TParenClose
                | TokenKind::BraceClose
                | TokenKind::VBraceClose
                | TokenKind::AngleClose
                | TokenKind::SquareClose
        )
    }

    /// The close kind paired with an open kind. This is the one place
    /// that knows the pairing.
    pub fn matching_close(self) -> Option<TokenKind> {
        Some(match self {
            TokenKind::ParenOpen => TokenKind::ParenClose,
            TokenKind::SParenOpen => TokenKind::SParenClose,
            TokenKind::FParenOpen => TokenKind::FParenClose,
            TokenKind::TParenOpen => TokenKind::TParenClose,
            TokenKind::BraceOpen => TokenKind::BraceClose,
            TokenKind::VBraceOpen => TokenKind::VBraceClose,
            TokenKind::AngleOpen => TokenKind::AngleClose,
            TokenKind::SquareOpen => TokenKind::SquareClose,
            _ => return None,
        })
    }

    pub fn matching_open(self) -> Option<TokenKind> {
        Some(match self {
            TokenKind::ParenClose => TokenKind::ParenOpen,
            TokenKind::SParenClose => TokenKind::SParenOpen,
            TokenKind::FParenClose => TokenKind::FParenOpen,
            TokenKind::TParenClose => TokenKind::TParenOpen,
            TokenKind::BraceClose => TokenKind::BraceOpen,
            TokenKind::VBraceClose => TokenKind::VBraceOpen,
            TokenKind::AngleClose => TokenKind::AngleOpen,
            TokenKind::SquareClose => TokenKind::SquareOpen,
            _ => return None,
        })
    }

    /// Kinds a `#` directive word can resolve to.
    pub fn is_pp_directive(self) -> bool {
        matches!(
            self,
            TokenKind::PpDefine
                | TokenKind::PpInclude
                | TokenKind::PpIf
                | TokenKind::PpElse
                | TokenKind::PpEndif
                | TokenKind::PpUndef
                | TokenKind::PpPragma
                | TokenKind::PpLine
                | TokenKind::PpError
                | TokenKind::PpWarning
                | TokenKind::PpRegion
                | TokenKind::PpOther
        )
    }

    /// Directives whose remainder is swallowed as one raw body chunk
    /// instead of being tokenized.
    pub fn pp_takes_raw_body(self) -> bool {
        matches!(
            self,
            TokenKind::PpPragma
                | TokenKind::PpLine
                | TokenKind::PpError
                | TokenKind::PpWarning
                | TokenKind::PpRegion
                | TokenKind::PpOther
        )
    }

}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Debug names are stable enough for the token dump.
        match self {
            TokenKind::Str => f.write_str("String"),
            TokenKind::StrMulti => f.write_str("StringMulti"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Per-chunk flag set.
///
/// The low 16 bits are the *copy* partition: they are inherited from
/// chunk to chunk inside a syntactic region. Everything above is local
/// to one chunk. [`ChunkFlags::COPY_MASK`] is the only encoding of that
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkFlags(pub u64);

macro_rules! flag {
    ($name:ident, $bit:expr) => {
        pub const $name: ChunkFlags = ChunkFlags(1u64 << $bit);
    };
}

impl ChunkFlags {
    pub const NONE: ChunkFlags = ChunkFlags(0);
    /// Copy partition: bits 0..16.
    pub const COPY_MASK: ChunkFlags = ChunkFlags(0x0000_ffff);

    // Copy flags
    flag!(IN_PREPROC, 0);
    flag!(IN_STRUCT, 1);
    flag!(IN_ENUM, 2);
    flag!(IN_FCN_DEF, 3);
    flag!(IN_FCN_CALL, 4);
    flag!(IN_SPAREN, 5);
    flag!(IN_TEMPLATE, 6);
    flag!(IN_TYPEDEF, 7);
    flag!(IN_CONST_ARGS, 8);
    flag!(IN_ARRAY_ASSIGN, 9);
    flag!(IN_CLASS, 10);
    flag!(IN_CLASS_BASE, 11);
    flag!(IN_NAMESPACE, 12);
    flag!(IN_FOR, 13);
    flag!(IN_OC_MSG, 14);

    // Local flags
    flag!(STMT_START, 17);
    flag!(EXPR_START, 18);
    flag!(VAR_TYPE, 22);
    flag!(VAR_DEF, 23);
    flag!(VAR_DECL, 24);
    flag!(VAR_INLINE, 25);
    flag!(OLD_FCN_PARAMS, 27);
    flag!(LVALUE, 28);
    flag!(ONE_LINER, 29);
    flag!(PUNCTUATOR, 32);
    flag!(KEYWORD, 33);
    flag!(OC_BOXED, 35);
    flag!(STATIC, 36);
    flag!(OC_RTYPE, 37);
    flag!(OC_ATYPE, 38);
    flag!(DEF, 39);
    flag!(PROTO, 40);
    flag!(REF, 41);
    flag!(TYPEDEF_STRUCT, 42);
    flag!(TYPEDEF_UNION, 43);
    flag!(TYPEDEF_ENUM, 44);

    pub fn contains(self, other: ChunkFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ChunkFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The bits that propagate to the next chunk in the same region.
    pub fn copy_part(self) -> ChunkFlags {
        ChunkFlags(self.0 & Self::COPY_MASK.0)
    }

    /// Names of set bits, for the token dump.
    pub fn names(self) -> Vec<&'static str> {
        const TABLE: &[(u32, &str)] = &[
            (0, "IN_PREPROC"),
            (1, "IN_STRUCT"),
            (2, "IN_ENUM"),
            (3, "IN_FCN_DEF"),
            (4, "IN_FCN_CALL"),
            (5, "IN_SPAREN"),
            (6, "IN_TEMPLATE"),
            (7, "IN_TYPEDEF"),
            (8, "IN_CONST_ARGS"),
            (9, "IN_ARRAY_ASSIGN"),
            (10, "IN_CLASS"),
            (11, "IN_CLASS_BASE"),
            (12, "IN_NAMESPACE"),
            (13, "IN_FOR"),
            (14, "IN_OC_MSG"),
            (17, "STMT_START"),
            (18, "EXPR_START"),
            (22, "VAR_TYPE"),
            (23, "VAR_DEF"),
            (24, "VAR_DECL"),
            (25, "VAR_INLINE"),
            (27, "OLD_FCN_PARAMS"),
            (28, "LVALUE"),
            (29, "ONE_LINER"),
            (32, "PUNCTUATOR"),
            (33, "KEYWORD"),
            (35, "OC_BOXED"),
            (36, "STATIC"),
            (37, "OC_RTYPE"),
            (38, "OC_ATYPE"),
            (39, "DEF"),
            (40, "PROTO"),
            (41, "REF"),
            (42, "TYPEDEF_STRUCT"),
            (43, "TYPEDEF_UNION"),
            (44, "TYPEDEF_ENUM"),
        ];
        TABLE
            .iter()
            .filter(|(bit, _)| self.0 & (1u64 << bit) != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for ChunkFlags {
    type Output = ChunkFlags;
    fn bitor(self, rhs: ChunkFlags) -> ChunkFlags {
        ChunkFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ChunkFlags {
    fn bitor_assign(&mut self, rhs: ChunkFlags) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for ChunkFlags {
    type Output = ChunkFlags;
    fn bitand(self, rhs: ChunkFlags) -> ChunkFlags {
        ChunkFlags(self.0 & rhs.0)
    }
}

impl std::ops::Not for ChunkFlags {
    type Output = ChunkFlags;
    fn not(self) -> ChunkFlags {
        ChunkFlags(!self.0)
    }
}

impl std::ops::Sub for ChunkFlags {
    type Output = ChunkFlags;
    fn sub(self, rhs: ChunkFlags) -> ChunkFlags {
        ChunkFlags(self.0 & !rhs.0)
    }
}

/// Identifier category of an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdKind {
    Identifier,
    Macro,
    MacroFunction,
    Function,
    Struct,
    Union,
    Enum,
    EnumVal,
    Class,
    StructType,
    UnionType,
    EnumType,
    FunctionType,
    Type,
    Var,
    Namespace,
}

impl IdKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Identifier => "IDENTIFIER",
            IdKind::Macro => "MACRO",
            IdKind::MacroFunction => "MACRO_FUNCTION",
            IdKind::Function => "FUNCTION",
            IdKind::Struct => "STRUCT",
            IdKind::Union => "UNION",
            IdKind::Enum => "ENUM",
            IdKind::EnumVal => "ENUM_VAL",
            IdKind::Class => "CLASS",
            IdKind::StructType => "STRUCT_TYPE",
            IdKind::UnionType => "UNION_TYPE",
            IdKind::EnumType => "ENUM_TYPE",
            IdKind::FunctionType => "FUNCTION_TYPE",
            IdKind::Type => "TYPE",
            IdKind::Var => "VAR",
            IdKind::Namespace => "NAMESPACE",
        }
    }

    pub fn from_str(s: &str) -> Option<IdKind> {
        Some(match s {
            "IDENTIFIER" => IdKind::Identifier,
            "MACRO" => IdKind::Macro,
            "MACRO_FUNCTION" => IdKind::MacroFunction,
            "FUNCTION" => IdKind::Function,
            "STRUCT" => IdKind::Struct,
            "UNION" => IdKind::Union,
            "ENUM" => IdKind::Enum,
            "ENUM_VAL" => IdKind::EnumVal,
            "CLASS" => IdKind::Class,
            "STRUCT_TYPE" => IdKind::StructType,
            "UNION_TYPE" => IdKind::UnionType,
            "ENUM_TYPE" => IdKind::EnumType,
            "FUNCTION_TYPE" => IdKind::FunctionType,
            "TYPE" => IdKind::Type,
            "VAR" => IdKind::Var,
            "NAMESPACE" => IdKind::Namespace,
            _ => return None,
        })
    }
}

/// Reference / definition / declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdSubKind {
    Reference,
    Definition,
    Declaration,
}

impl IdSubKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdSubKind::Reference => "REF",
            IdSubKind::Definition => "DEF",
            IdSubKind::Declaration => "DECL",
        }
    }

    /// Table name of the persistent store this sub-kind lands in.
    pub fn table(self) -> &'static str {
        match self {
            IdSubKind::Reference => "references",
            IdSubKind::Definition => "definitions",
            IdSubKind::Declaration => "declarations",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_kind_is_open_plus_one() {
        // The enum layout backs the adjacency the matcher's pairing
        // function promises.
        let opens = [
            TokenKind::ParenOpen,
            TokenKind::SParenOpen,
            TokenKind::FParenOpen,
            TokenKind::TParenOpen,
            TokenKind::BraceOpen,
            TokenKind::VBraceOpen,
            TokenKind::AngleOpen,
            TokenKind::SquareOpen,
        ];
        for open in opens {
            let close = open.matching_close().unwrap();
            assert_eq!(open as u16 + 1, close as u16, "{:?}", open);
            assert_eq!(close.matching_open(), Some(open));
            assert!(open.is_open());
            assert!(close.is_close());
        }
    }

    #[test]
    fn copy_mask_covers_only_low_bits() {
        assert!(ChunkFlags::IN_OC_MSG.copy_part() == ChunkFlags::IN_OC_MSG);
        assert!(ChunkFlags::STMT_START.copy_part().is_empty());
        assert!(ChunkFlags::DEF.copy_part().is_empty());
    }

    #[test]
    fn flag_algebra() {
        let f = ChunkFlags::VAR_DEF | ChunkFlags::STATIC;
        assert!(f.contains(ChunkFlags::VAR_DEF));
        assert!(f.intersects(ChunkFlags::STATIC));
        assert!((f - ChunkFlags::VAR_DEF) == ChunkFlags::STATIC);
    }
}
