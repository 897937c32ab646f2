// Base64 payload decoding, file type classification and binary detection
use crate::config::DecoderLimits;
use crate::error::{ArchiveError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Accepts missing or present padding and non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

lazy_static! {
    static ref BASE64_SHAPE: Regex = Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").unwrap();
}

/// Syntax check plus a real decode attempt.
pub fn is_valid_base64(input: &str) -> bool {
    BASE64_SHAPE.is_match(input) && LENIENT.decode(input).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Javascript,
    Typescript,
    Python,
    Java,
    Cpp,
    C,
    Csharp,
    Php,
    Ruby,
    Go,
    Rust,
    Swift,
    Kotlin,
    Html,
    Css,
    Scss,
    Sass,
    Less,
    Json,
    Xml,
    Yaml,
    Toml,
    Ini,
    Config,
    Markdown,
    Text,
    Restructuredtext,
    Shell,
    Sql,
    Image,
    Svg,
    Binary,
}

impl FileType {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "js" | "jsx" => FileType::Javascript,
            "ts" | "tsx" => FileType::Typescript,
            "py" => FileType::Python,
            "java" => FileType::Java,
            "cpp" => FileType::Cpp,
            "c" => FileType::C,
            "cs" => FileType::Csharp,
            "php" => FileType::Php,
            "rb" => FileType::Ruby,
            "go" => FileType::Go,
            "rs" => FileType::Rust,
            "swift" => FileType::Swift,
            "kt" => FileType::Kotlin,
            "html" | "htm" => FileType::Html,
            "css" => FileType::Css,
            "scss" => FileType::Scss,
            "sass" => FileType::Sass,
            "less" => FileType::Less,
            "json" => FileType::Json,
            "xml" => FileType::Xml,
            "yaml" | "yml" => FileType::Yaml,
            "toml" => FileType::Toml,
            "ini" => FileType::Ini,
            "conf" => FileType::Config,
            "md" | "markdown" => FileType::Markdown,
            "rst" => FileType::Restructuredtext,
            "sh" | "bash" | "zsh" | "fish" => FileType::Shell,
            "sql" => FileType::Sql,
            "png" | "jpg" | "jpeg" | "gif" | "webp" => FileType::Image,
            "svg" => FileType::Svg,
            "pdf" | "zip" | "tar" | "gz" => FileType::Binary,
            _ => FileType::Text,
        }
    }

    /// Classify by the text after the final `.`; no extension means text.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.rsplit_once('.') {
            Some((_, extension)) => Self::from_extension(extension),
            None => FileType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Javascript => "javascript",
            FileType::Typescript => "typescript",
            FileType::Python => "python",
            FileType::Java => "java",
            FileType::Cpp => "cpp",
            FileType::C => "c",
            FileType::Csharp => "csharp",
            FileType::Php => "php",
            FileType::Ruby => "ruby",
            FileType::Go => "go",
            FileType::Rust => "rust",
            FileType::Swift => "swift",
            FileType::Kotlin => "kotlin",
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Scss => "scss",
            FileType::Sass => "sass",
            FileType::Less => "less",
            FileType::Json => "json",
            FileType::Xml => "xml",
            FileType::Yaml => "yaml",
            FileType::Toml => "toml",
            FileType::Ini => "ini",
            FileType::Config => "config",
            FileType::Markdown => "markdown",
            FileType::Text => "text",
            FileType::Restructuredtext => "restructuredtext",
            FileType::Shell => "shell",
            FileType::Sql => "sql",
            FileType::Image => "image",
            FileType::Svg => "svg",
            FileType::Binary => "binary",
        }
    }

    /// Language tag for syntax highlighting.
    pub fn syntax_language(&self) -> &'static str {
        match self {
            FileType::Shell => "bash",
            FileType::Svg => "xml",
            FileType::Text
            | FileType::Ini
            | FileType::Config
            | FileType::Restructuredtext
            | FileType::Image
            | FileType::Binary => "text",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin1")]
    Latin1,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "error")]
    Error,
}

/// Text view of one file payload. Derived on demand, never stored in the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedContent {
    pub content: String,
    pub encoding: Encoding,
    pub file_type: FileType,
    pub is_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentDecoder {
    limits: DecoderLimits,
}

impl ContentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Decode failures are reported inside the result, never returned as errors.
    pub fn decode(&self, base64_content: &str, file_name: &str) -> DecodedContent {
        let file_type = FileType::from_file_name(file_name);

        let bytes = match decode_bytes(base64_content) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not decode {}: {}", file_name, e);
                return DecodedContent {
                    content: String::new(),
                    encoding: Encoding::Error,
                    file_type,
                    is_binary: false,
                    error: Some(e.to_string()),
                };
            }
        };

        if self.is_binary_content(&bytes) {
            return DecodedContent {
                content: format!("[Binary file: {}]", file_name),
                encoding: Encoding::Binary,
                file_type,
                is_binary: true,
                error: None,
            };
        }

        match String::from_utf8(bytes) {
            Ok(content) => DecodedContent {
                content,
                encoding: Encoding::Utf8,
                file_type,
                is_binary: false,
                error: None,
            },
            Err(e) => {
                debug!("{} is not valid UTF-8, reading as latin1", file_name);
                // Each byte maps to the code point of the same value.
                let content = e.into_bytes().into_iter().map(char::from).collect();
                DecodedContent {
                    content,
                    encoding: Encoding::Latin1,
                    file_type,
                    is_binary: false,
                    error: None,
                }
            }
        }
    }

    pub fn encode(&self, content: &str) -> String {
        STANDARD.encode(content.as_bytes())
    }

    /// Any NUL byte, or too many non-printable bytes in the leading sample.
    pub fn is_binary_content(&self, bytes: &[u8]) -> bool {
        if bytes.contains(&0) {
            return true;
        }

        let sample_size = bytes.len().min(self.limits.binary_sample_size);
        if sample_size == 0 {
            return false;
        }

        let non_printable = bytes[..sample_size]
            .iter()
            .filter(|&&b| (b < 32 && b != b'\t' && b != b'\n' && b != b'\r') || b > 126)
            .count();

        (non_printable as f64 / sample_size as f64) > self.limits.binary_threshold
    }

    pub fn should_analyze(&self, file_name: &str, decoded: &DecodedContent) -> bool {
        if decoded.is_binary {
            return false;
        }
        if decoded.content.chars().count() > self.limits.max_analyze_chars {
            debug!("Skipping analysis of {}: content too large", file_name);
            return false;
        }
        !matches!(decoded.file_type, FileType::Image | FileType::Binary)
    }
}

pub(crate) fn decode_bytes(base64_content: &str) -> Result<Vec<u8>> {
    LENIENT
        .decode(base64_content)
        .map_err(|e| ArchiveError::Decode(e.to_string()))
}
