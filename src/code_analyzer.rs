// Heuristic code metrics - regex pattern counts per language family
use crate::decoder::FileType;
use crate::models::CodeMetrics;
use lazy_static::lazy_static;
use regex::Regex;

/// Counting patterns for one language family. Every pattern is applied
/// independently, so overlapping constructs may be counted twice.
struct LanguageRules {
    functions: Vec<Regex>,
    classes: Vec<Regex>,
    imports: Vec<Regex>,
    exports: Vec<Regex>,
    branch_keywords: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

/// Whole-word matchers for branching keywords and operators.
fn keywords(words: &[&str]) -> Vec<Regex> {
    words
        .iter()
        .map(|w| Regex::new(&format!(r"\b{}\b", regex::escape(w))).unwrap())
        .collect()
}

lazy_static! {
    static ref JAVASCRIPT: LanguageRules = LanguageRules {
        functions: compile(&[
            r"function\s+\w+\s*\(",
            r"const\s+\w+\s*=\s*\([^)]*\)\s*=>",
            r"let\s+\w+\s*=\s*\([^)]*\)\s*=>",
            r"var\s+\w+\s*=\s*\([^)]*\)\s*=>",
            r"\w+\s*:\s*\([^)]*\)\s*=>",
            r"\w+\s*\([^)]*\)\s*\{",
            r"async\s+function\s+\w+",
            r"async\s+\w+\s*\(",
        ]),
        classes: compile(&[
            r"class\s+\w+",
            r"interface\s+\w+",
            r"type\s+\w+\s*=",
            r"enum\s+\w+",
        ]),
        imports: compile(&[
            r#"import\s+.*from\s+['"`]"#,
            r"import\s*\(",
            r"require\s*\(",
            r#"import\s+['"`]"#,
        ]),
        exports: compile(&[
            r"export\s+default",
            r"export\s+\{[^}]*\}",
            r"export\s+\*",
            r"export\s+const\s+\w+",
            r"export\s+let\s+\w+",
            r"export\s+var\s+\w+",
            r"export\s+function\s+\w+",
            r"export\s+class\s+\w+",
            r"module\.exports\s*=",
        ]),
        branch_keywords: keywords(&[
            "if", "else", "while", "for", "switch", "case", "catch", "try", "&&", "||", "?",
        ]),
    };

    static ref PYTHON: LanguageRules = LanguageRules {
        functions: compile(&[r"def\s+\w+\s*\("]),
        classes: compile(&[r"class\s+\w+"]),
        imports: compile(&[r"import\s+\w+", r"from\s+\w+\s+import"]),
        exports: Vec::new(),
        branch_keywords: keywords(&[
            "if", "elif", "else", "while", "for", "try", "except", "and", "or",
        ]),
    };

    static ref JAVA: LanguageRules = LanguageRules {
        functions: compile(&[
            r"(public|private|protected)?\s*(static)?\s*\w+\s+\w+\s*\([^)]*\)\s*\{",
        ]),
        classes: compile(&[r"(public|private)?\s*(class|interface|enum)\s+\w+"]),
        imports: compile(&[r"import\s+[\w.]+;"]),
        exports: Vec::new(),
        branch_keywords: keywords(&[
            "if", "else", "while", "for", "switch", "case", "catch", "try", "&&", "||", "?",
        ]),
    };

    static ref C_FAMILY: LanguageRules = LanguageRules {
        functions: compile(&[r"\w+\s+\w+\s*\([^)]*\)\s*\{"]),
        classes: compile(&[r"(struct|class)\s+\w+"]),
        imports: compile(&[r#"#include\s*[<"]"#]),
        exports: Vec::new(),
        branch_keywords: keywords(&[
            "if", "else", "while", "for", "switch", "case", "&&", "||", "?",
        ]),
    };

    static ref CSHARP: LanguageRules = LanguageRules {
        functions: compile(&[
            r"(public|private|protected|internal)?\s*(static)?\s*\w+\s+\w+\s*\([^)]*\)\s*\{",
        ]),
        classes: compile(&[r"(public|private|internal)?\s*(class|interface|struct|enum)\s+\w+"]),
        imports: compile(&[r"using\s+[\w.]+;"]),
        exports: Vec::new(),
        branch_keywords: keywords(&[
            "if", "else", "while", "for", "foreach", "switch", "case", "catch", "try", "&&",
            "||", "?",
        ]),
    };

    static ref GENERIC_CALL: Regex = Regex::new(r"\w+\s*\([^)]*\)").unwrap();
    static ref GENERIC_IMPORT: Regex = Regex::new(r"(import|include|require|using)\s+").unwrap();

    static ref JS_SIGNATURES: Vec<Regex> = compile(&[
        r"function\s+(\w+)\s*\([^)]*\)",
        r"const\s+(\w+)\s*=\s*\([^)]*\)\s*=>",
        r"(\w+)\s*:\s*\([^)]*\)\s*=>",
    ]);
    static ref PY_SIGNATURE: Regex = Regex::new(r"def\s+(\w+)\s*\([^)]*\):").unwrap();

    static ref CLASS_NAME: Regex = Regex::new(r"class\s+(\w+)").unwrap();
    static ref CLASS_OR_INTERFACE_NAME: Regex = Regex::new(r"(?:class|interface)\s+(\w+)").unwrap();
    static ref CSHARP_TYPE_NAME: Regex = Regex::new(r"(?:class|interface|struct)\s+(\w+)").unwrap();
}

/// The closed set of analyzers, picked from a file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    JavaScript,
    Python,
    Java,
    CFamily,
    CSharp,
    Generic,
}

impl LanguageFamily {
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Javascript | FileType::Typescript => LanguageFamily::JavaScript,
            FileType::Python => LanguageFamily::Python,
            FileType::Java => LanguageFamily::Java,
            FileType::Cpp | FileType::C => LanguageFamily::CFamily,
            FileType::Csharp => LanguageFamily::CSharp,
            _ => LanguageFamily::Generic,
        }
    }

    fn rules(&self) -> Option<&'static LanguageRules> {
        match self {
            LanguageFamily::JavaScript => Some(&*JAVASCRIPT),
            LanguageFamily::Python => Some(&*PYTHON),
            LanguageFamily::Java => Some(&*JAVA),
            LanguageFamily::CFamily => Some(&*C_FAMILY),
            LanguageFamily::CSharp => Some(&*CSHARP),
            LanguageFamily::Generic => None,
        }
    }
}

fn count_all(patterns: &[Regex], content: &str) -> usize {
    patterns.iter().map(|p| p.find_iter(content).count()).sum()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeAnalyzer;

impl CodeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Never fails: unknown file types get the generic estimate.
    pub fn analyze(&self, content: &str, file_type: FileType) -> CodeMetrics {
        let lines_of_code = count_lines_of_code(content);

        match LanguageFamily::for_file_type(file_type).rules() {
            Some(rules) => CodeMetrics {
                functions: count_all(&rules.functions, content),
                classes: count_all(&rules.classes, content),
                imports: count_all(&rules.imports, content),
                exports: count_all(&rules.exports, content),
                lines_of_code,
                complexity: Some(1 + count_all(&rules.branch_keywords, content)),
            },
            None => {
                let calls = GENERIC_CALL.find_iter(content).count();
                let imports = content.lines().filter(|l| GENERIC_IMPORT.is_match(l)).count();
                CodeMetrics {
                    // At most one per five lines of code
                    functions: calls.min(lines_of_code / 5),
                    classes: 0,
                    imports,
                    exports: 0,
                    lines_of_code,
                    complexity: None,
                }
            }
        }
    }

    /// Full matched text of each function declaration (JS/TS and Python only).
    pub fn extract_function_signatures(&self, content: &str, file_type: FileType) -> Vec<String> {
        match file_type {
            FileType::Javascript | FileType::Typescript => JS_SIGNATURES
                .iter()
                .flat_map(|p| p.find_iter(content).map(|m| m.as_str().to_string()))
                .collect(),
            FileType::Python => PY_SIGNATURE
                .find_iter(content)
                .map(|m| m.as_str().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn extract_class_names(&self, content: &str, file_type: FileType) -> Vec<String> {
        let pattern: &Regex = match file_type {
            FileType::Javascript | FileType::Python => &*CLASS_NAME,
            FileType::Typescript | FileType::Java => &*CLASS_OR_INTERFACE_NAME,
            FileType::Csharp => &*CSHARP_TYPE_NAME,
            _ => return Vec::new(),
        };
        pattern
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

/// Non-empty lines not starting with `//` or `/*`. Block comment bodies and
/// other comment syntaxes are still counted.
pub fn count_lines_of_code(content: &str) -> usize {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//") && !line.starts_with("/*"))
        .count()
}
