use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Language tag supplied by the editor alongside the file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Java,
    Python,
    Cpp,
    JavaScript,
    PlainText,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Java,
        Language::Python,
        Language::Cpp,
        Language::JavaScript,
        Language::PlainText,
    ];

    /// Pick a language from the file extension. Unknown extensions are plain text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("java") => Language::Java,
            Some("py") => Language::Python,
            Some("cpp") | Some("h") | Some("c") => Language::Cpp,
            Some("js") => Language::JavaScript,
            _ => Language::PlainText,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::Python => "Python",
            Language::Cpp => "C++",
            Language::JavaScript => "JavaScript",
            Language::PlainText => "Plain Text",
        }
    }

    /// Whether the command builder has a run mapping for this language.
    pub fn is_runnable(&self) -> bool {
        !matches!(self, Language::PlainText)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python" | "py" => Ok(Language::Python),
            "c++" | "cpp" | "cxx" => Ok(Language::Cpp),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "plain text" | "plaintext" | "text" | "txt" => Ok(Language::PlainText),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}
