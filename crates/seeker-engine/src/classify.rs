use crate::types::{Category, Classification};
use std::path::Path;

/// Classify a path by its (case-insensitive) extension.
///
/// Returns `None` for extensionless files, which the indexer skips entirely.
/// Unknown extensions fall through to [`Category::Text`].
pub fn classify(path: &Path) -> Option<Classification> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }

    if is_image_extension(&ext) {
        return Some(Classification {
            category: Category::Image,
            language_label: None,
        });
    }

    Some(match language_label(&ext) {
        Some(label) => Classification {
            category: Category::Code,
            language_label: Some(label),
        },
        None => Classification {
            category: Category::Text,
            language_label: None,
        },
    })
}

fn is_image_extension(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "png")
}

/// Extension (without dot, lowercase) to the label prefixed onto code summaries.
pub fn language_label(ext: &str) -> Option<&'static str> {
    let label = match ext {
        "py" => "Python source code",
        "js" => "JavaScript source code",
        "c" => "C source code",
        "h" => "C header file",
        "java" => "Java source code",
        "cpp" => "C++ source code",
        "hpp" => "C++ header file",
        "html" => "HTML file",
        "css" => "CSS file",
        "xml" => "XML file",
        "json" => "JSON file",
        "md" => "Markdown file",
        "csv" => "CSV file",
        "xls" => "Excel file",
        "xlsx" => "Excel file (modern format)",
        "php" => "PHP source code",
        "rb" => "Ruby source code",
        "swift" => "Swift source code",
        "go" => "Go source code",
        "sql" => "SQL script",
        "pl" => "Perl source code",
        "asm" => "Assembly language source code",
        "sh" => "Shell script",
        "lua" => "Lua script",
        "r" => "R script",
        "scala" => "Scala source code",
        "kt" => "Kotlin source code",
        "cs" => "C# source code",
        "vb" => "Visual Basic .NET source code",
        "fs" => "F# source code",
        "coffee" => "CoffeeScript source code",
        "jl" => "Julia source code",
        "ts" => "TypeScript source code",
        "dart" => "Dart source code",
        "rs" => "Rust source code",
        "groovy" => "Groovy source code",
        "d" => "D source code",
        "hs" => "Haskell source code",
        "erl" => "Erlang source code",
        "clj" => "Clojure source code",
        "elm" => "Elm source code",
        _ => return None,
    };
    Some(label)
}
