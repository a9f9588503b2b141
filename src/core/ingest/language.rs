//! Language and file-kind detection by extension.

use crate::core::types::CandidatePath;

/// Detect programming language from a lowercased file extension
pub fn detect_language(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "rs" => "rust",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" | "pyi" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" | "cc" | "cxx" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" | "sc" => "scala",
        "clj" | "cljs" | "cljc" => "clojure",
        "ex" | "exs" => "elixir",
        "erl" | "hrl" => "erlang",
        "hs" => "haskell",
        "ml" | "mli" => "ocaml",
        "fs" | "fsx" => "fsharp",
        "dart" => "dart",
        "lua" => "lua",
        "pl" | "pm" => "perl",
        "r" => "r",
        "jl" => "julia",
        "zig" => "zig",
        "vue" => "vue",
        "svelte" => "svelte",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "less" => "less",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "markdown" => "markdown",
        "rst" => "restructuredtext",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "graphql" | "gql" => "graphql",
        "proto" => "protobuf",
        _ => return None,
    };
    Some(language)
}

/// Broad category of a file, ordered by how useful it usually is to
/// semantic code queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    Source,
    Docs,
    Config,
    Other,
}

impl FileKind {
    pub fn of(candidate: &CandidatePath) -> Self {
        if let Some(name) = candidate.file_name() {
            match name {
                "Dockerfile" | "Makefile" | "Justfile" | "Rakefile" | "Gemfile" => {
                    return FileKind::Config
                }
                "README" | "LICENSE" | "CHANGELOG" | "CONTRIBUTING" => return FileKind::Docs,
                _ => {}
            }
        }

        let Some(extension) = candidate.extension() else {
            return FileKind::Other;
        };

        match extension.as_str() {
            "md" | "markdown" | "rst" | "txt" | "adoc" => FileKind::Docs,
            "json" | "yaml" | "yml" | "toml" | "xml" | "ini" | "cfg" | "conf" | "env"
            | "properties" | "csv" | "tsv" => FileKind::Config,
            ext if detect_language(ext).is_some() => FileKind::Source,
            _ => FileKind::Other,
        }
    }

    /// Sort rank; lower comes first
    pub fn rank(self) -> u8 {
        self as u8
    }
}
