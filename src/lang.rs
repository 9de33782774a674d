//! Language selection.
//!
//! A file is analyzed under a bitmask of language flags rather than a
//! single enum value: C++ implies C, Objective-C++ implies both C++ and
//! Objective-C, and the keyword/punctuator tables are filtered by the
//! mask. The mask is chosen from the file extension unless the driver
//! forces a language tag.

use std::path::Path;

use crate::error::{IndexerError, Result};

pub type LangMask = u16;

pub const LANG_NONE: LangMask = 0x0000;
pub const LANG_C: LangMask = 0x0001;
pub const LANG_CPP: LangMask = 0x0002;
pub const LANG_D: LangMask = 0x0004;
pub const LANG_CS: LangMask = 0x0008;
pub const LANG_JAVA: LangMask = 0x0010;
pub const LANG_OC: LangMask = 0x0020;
pub const LANG_VALA: LangMask = 0x0040;
pub const LANG_PAWN: LangMask = 0x0080;
pub const LANG_ECMA: LangMask = 0x0100;

/// All C-like languages (everything except Pawn and ECMA's oddities are
/// close enough to share most of the tables).
pub const LANG_ALLC: LangMask = LANG_C
    | LANG_CPP
    | LANG_D
    | LANG_CS
    | LANG_JAVA
    | LANG_OC
    | LANG_VALA
    | LANG_ECMA;
pub const LANG_ALL: LangMask = LANG_ALLC | LANG_PAWN;

/// Table-entry bit: the keyword only matches inside a preprocessor
/// directive.
pub const FLAG_PP: LangMask = 0x8000;

struct FileLang {
    ext: &'static str,
    tag: &'static str,
    lang: LangMask,
}

const LANGUAGES: &[FileLang] = &[
    FileLang { ext: ".c", tag: "C", lang: LANG_C },
    FileLang { ext: ".cpp", tag: "CPP", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".d", tag: "D", lang: LANG_D },
    FileLang { ext: ".cs", tag: "CS", lang: LANG_CS },
    FileLang { ext: ".vala", tag: "VALA", lang: LANG_VALA },
    FileLang { ext: ".java", tag: "JAVA", lang: LANG_JAVA },
    FileLang { ext: ".pawn", tag: "PAWN", lang: LANG_PAWN },
    FileLang { ext: ".p", tag: "", lang: LANG_PAWN },
    FileLang { ext: ".sma", tag: "", lang: LANG_PAWN },
    FileLang { ext: ".inl", tag: "", lang: LANG_PAWN },
    FileLang { ext: ".h", tag: "", lang: LANG_C },
    FileLang { ext: ".cxx", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".hpp", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".hxx", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".cc", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".hh", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".cp", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".c++", tag: "", lang: LANG_CPP | LANG_C },
    FileLang { ext: ".di", tag: "", lang: LANG_D },
    FileLang { ext: ".m", tag: "OC", lang: LANG_OC | LANG_C },
    FileLang { ext: ".mm", tag: "OC+", lang: LANG_OC | LANG_CPP | LANG_C },
    FileLang { ext: ".sqc", tag: "", lang: LANG_C }, // embedded SQL
    FileLang { ext: ".es", tag: "ECMA", lang: LANG_ECMA },
    FileLang { ext: ".js", tag: "", lang: LANG_ECMA },
    FileLang { ext: ".as", tag: "", lang: LANG_ECMA },
];

/// Picks the language mask from the file extension. Defaults to C.
pub fn language_from_path(path: &Path) -> LangMask {
    let name = path.to_string_lossy();
    for entry in LANGUAGES {
        // The .C/.CPP uppercase C++ convention still matters on
        // case-sensitive filesystems.
        if name.ends_with(entry.ext)
            || (entry.lang & LANG_CPP != 0 && name.ends_with(&entry.ext.to_uppercase()))
        {
            return entry.lang;
        }
    }
    LANG_C
}

/// Resolves a forced-language tag (`-l CPP`, `-l OC+`, ...).
pub fn language_from_tag(tag: &str) -> Result<LangMask> {
    for entry in LANGUAGES {
        if !entry.tag.is_empty() && entry.tag.eq_ignore_ascii_case(tag) {
            return Ok(entry.lang);
        }
    }
    Err(IndexerError::UnknownLanguage(tag.to_string()))
}

/// Display tag for a mask, best effort.
pub fn language_to_string(lang: LangMask) -> &'static str {
    for entry in LANGUAGES {
        if entry.lang == lang && !entry.tag.is_empty() {
            return entry.tag;
        }
    }
    for entry in LANGUAGES {
        if entry.lang & lang != 0 && !entry.tag.is_empty() {
            return entry.tag;
        }
    }
    "???"
}

/// True when any extension in the table matches; used by the directory
/// walker to filter candidate files.
pub fn is_supported(path: &Path) -> bool {
    let name = path.to_string_lossy();
    LANGUAGES.iter().any(|e| name.ends_with(e.ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_common_extensions() {
        assert_eq!(language_from_path(&PathBuf::from("foo.c")), LANG_C);
        assert_eq!(language_from_path(&PathBuf::from("foo.h")), LANG_C);
        assert_eq!(
            language_from_path(&PathBuf::from("foo.cpp")),
            LANG_CPP | LANG_C
        );
        assert_eq!(
            language_from_path(&PathBuf::from("foo.mm")),
            LANG_OC | LANG_CPP | LANG_C
        );
        assert_eq!(language_from_path(&PathBuf::from("foo.java")), LANG_JAVA);
        assert_eq!(language_from_path(&PathBuf::from("foo.js")), LANG_ECMA);
    }

    #[test]
    fn unknown_extension_defaults_to_c() {
        assert_eq!(language_from_path(&PathBuf::from("Makefile")), LANG_C);
    }

    #[test]
    fn tags_round_trip() {
        assert_eq!(language_from_tag("cpp").unwrap(), LANG_CPP | LANG_C);
        assert_eq!(language_from_tag("OC+").unwrap(), LANG_OC | LANG_CPP | LANG_C);
        assert!(language_from_tag("cobol").is_err());
    }
}
