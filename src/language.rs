// src/language.rs
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::IdeError;

/// Languages the IDE panel offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    C,
    Cpp,
    Java,
    Kotlin,
    Pascal,
    PyPy,
    Python,
    Scratch,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Kotlin,
        Language::Pascal,
        Language::PyPy,
        Language::Python,
        Language::Scratch,
    ];

    /// Internal key, also the editor's language selector value.
    pub fn key(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Pascal => "pascal",
            Language::PyPy => "pypy",
            Language::Python => "python",
            Language::Scratch => "scratch",
        }
    }

    /// Text of the language option as shown in the selector.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "CPP20",
            Language::Java => "JAVA",
            Language::Kotlin => "KOTLIN",
            Language::Pascal => "PASCAL",
            Language::PyPy => "PYPY",
            Language::Python => "PYTHON",
            Language::Scratch => "SCRATCH",
        }
    }

    /// The `language` value sent to `/problem/run_code`.
    pub fn judge_code(self) -> String {
        judge_code_from_display(self.display_name())
    }

    /// Language id expected by the grading form. Scratch cannot be graded from the IDE.
    pub fn grading_id(self) -> Option<u32> {
        match self {
            Language::C => Some(5),
            Language::Cpp => Some(4),
            Language::Java => Some(18),
            Language::Kotlin => Some(15),
            Language::Pascal => Some(7),
            Language::PyPy => Some(16),
            Language::Python => Some(9),
            Language::Scratch => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Language::C => "main.c",
            Language::Cpp => "main.cpp",
            Language::Java => "Main.java",
            Language::Kotlin => "Main.kt",
            Language::Pascal => "Main.pas",
            Language::PyPy | Language::Python => "main.py",
            Language::Scratch => "main.sb3",
        }
    }

    /// Guess the language from a source file's extension. `.py` resolves to CPython.
    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "kt" => Some(Language::Kotlin),
            "pas" => Some(Language::Pascal),
            "py" => Some(Language::Python),
            "sb3" => Some(Language::Scratch),
            _ => None,
        }
    }

    /// Map a language name as listed on a problem page to an IDE language.
    /// `output only` problems and unknown names have no IDE language.
    pub fn from_alias(alias: &str) -> Option<Language> {
        match alias.trim().to_lowercase().as_str() {
            "c" => Some(Language::C),
            "c++" | "cpp" | "cpp20" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "kotlin" => Some(Language::Kotlin),
            "pascal" | "pas" => Some(Language::Pascal),
            "pypy" => Some(Language::PyPy),
            "py3" | "python" => Some(Language::Python),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Language {
    type Err = IdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.key() == wanted)
            .or_else(|| Language::from_alias(&wanted))
            .ok_or_else(|| IdeError::UnsupportedLanguage(s.to_string()))
    }
}

/// Uppercase the option text, then apply the two ICPC renames the judge expects.
pub fn judge_code_from_display(display: &str) -> String {
    let upper = display.trim().to_uppercase();
    match upper.as_str() {
        "C" => "CICPC".to_string(),
        "CPP20" => "CPPICPC".to_string(),
        _ => upper,
    }
}

/// Parse a problem's comma separated "allowed languages" text into IDE languages.
pub fn parse_allowed_languages(raw: &str) -> BTreeSet<Language> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(Language::from_alias)
        .collect()
}
