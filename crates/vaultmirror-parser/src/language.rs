//! Code fence language → remote language identifier

/// Identifier used when a fence language is missing or unknown
pub const PLAIN_TEXT: &str = "plain text";

/// Map a fence info string to the nearest supported remote language.
///
/// Only the first word of the info string is considered; it is trimmed and
/// lowercased before lookup. Unknown languages map to [`PLAIN_TEXT`].
pub fn normalize_language(info: &str) -> &'static str {
    let token = info
        .trim()
        .split(|c: char| c.is_whitespace() || c == '{' || c == ',')
        .next()
        .unwrap_or("")
        .to_lowercase();

    match token.as_str() {
        "py" | "python" | "python3" => "python",
        "js" | "javascript" | "jsx" | "mjs" | "cjs" | "node" => "javascript",
        "ts" | "typescript" | "tsx" => "typescript",
        "rs" | "rust" => "rust",
        "sh" | "shell" | "zsh" | "console" => "shell",
        "bash" => "bash",
        "fish" => "shell",
        "ps" | "ps1" | "powershell" | "pwsh" => "powershell",
        "json" | "jsonc" | "json5" => "json",
        "yml" | "yaml" => "yaml",
        "md" | "markdown" => "markdown",
        "html" | "htm" | "xhtml" => "html",
        "xml" | "svg" => "xml",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "java" => "java",
        "kt" | "kotlin" => "kotlin",
        "scala" => "scala",
        "groovy" | "gradle" => "groovy",
        "c" | "h" => "c",
        "cpp" | "c++" | "cc" | "cxx" | "hpp" => "c++",
        "cs" | "csharp" | "c#" => "c#",
        "fs" | "fsharp" | "f#" => "f#",
        "go" | "golang" => "go",
        "rb" | "ruby" => "ruby",
        "php" => "php",
        "pl" | "perl" => "perl",
        "lua" => "lua",
        "r" => "r",
        "swift" => "swift",
        "objc" | "objective-c" | "objectivec" => "objective-c",
        "dart" => "dart",
        "ex" | "exs" | "elixir" => "elixir",
        "erl" | "erlang" => "erlang",
        "hs" | "haskell" => "haskell",
        "ml" | "ocaml" => "ocaml",
        "clj" | "clojure" => "clojure",
        "lisp" | "elisp" | "emacs-lisp" => "lisp",
        "scheme" | "racket" => "scheme",
        "jl" | "julia" => "julia",
        "matlab" | "octave" => "matlab",
        "sql" | "psql" | "mysql" | "sqlite" => "sql",
        "graphql" | "gql" => "graphql",
        "dockerfile" | "docker" => "docker",
        "makefile" | "make" | "mk" => "makefile",
        "tex" | "latex" => "latex",
        "mermaid" => "mermaid",
        "diff" | "patch" => "diff",
        "nix" => "nix",
        "vb" | "vbnet" | "vb.net" => "vb.net",
        "wasm" | "wat" => "webassembly",
        "proto" | "protobuf" => "protobuf",
        "toml" | "ini" | "conf" => "plain text",
        _ => PLAIN_TEXT,
    }
}
