// Search engine - lazy in-memory index over file names and decoded content
use crate::config::SearchLimits;
use crate::decoder::ContentDecoder;
use crate::error::ArchiveError;
use crate::models::{Archive, ArchiveNode, IndexStats, SearchMatch, SearchResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

lazy_static! {
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z])([A-Z])").unwrap();
}

/// Path -> keywords and path -> decoded text, both kept in traversal order.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    files: Vec<(String, Vec<String>)>,
    content: Vec<(String, String)>,
    positions: HashMap<String, (Option<usize>, Option<usize>)>,
}

impl SearchIndex {
    fn insert_keywords(&mut self, path: &str, keywords: Vec<String>) {
        let slot = self.positions.entry(path.to_string()).or_default();
        match slot.0 {
            Some(i) => self.files[i].1 = keywords,
            None => {
                slot.0 = Some(self.files.len());
                self.files.push((path.to_string(), keywords));
            }
        }
    }

    fn insert_content(&mut self, path: &str, text: String) {
        let slot = self.positions.entry(path.to_string()).or_default();
        match slot.1 {
            Some(i) => self.content[i].1 = text,
            None => {
                slot.1 = Some(self.content.len());
                self.content.push((path.to_string(), text));
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_files: self.files.len(),
            total_content: self.content.len(),
            index_size: self.content.iter().map(|(_, text)| text.chars().count()).sum(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedIndex {
    archive_id: u64,
    index: SearchIndex,
}

/// Answers case-insensitive substring queries. The index is built on the
/// first search and rebuilt whenever a different archive is searched.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    decoder: ContentDecoder,
    limits: SearchLimits,
    cache: Option<CachedIndex>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_decoder(mut self, decoder: ContentDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn search(&mut self, archive: &Archive, query: &str) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        self.ensure_index(archive);
        let limits = self.limits;
        let Some(CachedIndex { index, .. }) = &self.cache else {
            return Vec::new();
        };
        let query_lower = query.to_lowercase();
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for (path, text) in &index.content {
            let matches = find_matches(text, query, &limits);
            if !matches.is_empty() {
                seen.insert(path.as_str());
                results.push(SearchResult {
                    path: path.clone(),
                    file_name: file_name_of(path).to_string(),
                    content: text.chars().take(limits.preview_chars).collect(),
                    matches,
                });
            }
        }

        for (path, keywords) in &index.files {
            if seen.contains(path.as_str()) {
                continue;
            }
            let file_name = file_name_of(path);
            let text = if file_name.to_lowercase().contains(&query_lower) {
                file_name.to_string()
            } else if let Some(keyword) = keywords.iter().find(|k| k.contains(&query_lower)) {
                keyword.clone()
            } else {
                continue;
            };
            results.push(SearchResult {
                path: path.clone(),
                file_name: file_name.to_string(),
                content: String::new(),
                matches: vec![SearchMatch {
                    line: 0,
                    column: 0,
                    text,
                    context: format!("File name match: {}", file_name),
                }],
            });
        }

        debug!("Query {:?} matched {} entries", query, results.len());
        results.truncate(limits.max_results);
        results
    }

    pub fn clear_index(&mut self) {
        self.cache = None;
    }

    /// `None` until the first search builds an index.
    pub fn get_index_stats(&self) -> Option<IndexStats> {
        self.cache.as_ref().map(|cached| cached.index.stats())
    }

    fn ensure_index(&mut self, archive: &Archive) {
        let stale = self
            .cache
            .as_ref()
            .map_or(true, |cached| cached.archive_id != archive.id());
        if stale {
            let index = self.build_search_index(archive);
            self.cache = Some(CachedIndex {
                archive_id: archive.id(),
                index,
            });
        }
    }

    pub fn build_search_index(&self, archive: &Archive) -> SearchIndex {
        let mut index = SearchIndex::default();

        archive.walk(|path, node| match node {
            ArchiveNode::File {
                name,
                content_base64,
            } => {
                index.insert_keywords(path, extract_keywords(name));
                if let Some(payload) = content_base64 {
                    let decoded = self.decoder.decode(payload, name);
                    if let Some(reason) = decoded.error {
                        let err = ArchiveError::SearchIndex {
                            path: path.to_string(),
                            reason,
                        };
                        warn!("{}", err);
                    } else if !decoded.is_binary {
                        index.insert_content(path, decoded.content);
                    }
                }
            }
            ArchiveNode::Directory { name, .. } => {
                index.insert_keywords(path, vec![name.to_lowercase()]);
            }
        });

        let stats = index.stats();
        info!(
            "Indexed {} paths ({} with content) for {}",
            stats.total_files,
            stats.total_content,
            archive.name()
        );
        index
    }
}

fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Full name, stem, extension and camelCase/snake_case/kebab-case parts, lowercased.
pub fn extract_keywords(file_name: &str) -> Vec<String> {
    let mut keywords = vec![file_name.to_string()];

    if let Some(stem) = file_name.split('.').next() {
        if stem != file_name {
            keywords.push(stem.to_string());
        }
    }
    if let Some((_, extension)) = file_name.rsplit_once('.') {
        keywords.push(extension.to_string());
    }

    let spaced = CAMEL_BOUNDARY.replace_all(file_name, "$1 $2");
    keywords.extend(
        spaced
            .replace(['_', '-'], " ")
            .split_whitespace()
            .map(str::to_string),
    );

    keywords
        .into_iter()
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase())
        .collect()
}

/// Lowercased line plus, for every lowered char, the index of the source
/// char it came from. One source char may lower to several chars.
struct LoweredLine {
    chars: Vec<char>,
    origin: Vec<usize>,
}

impl LoweredLine {
    fn new(source: &[char]) -> Self {
        let mut chars = Vec::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        for (i, c) in source.iter().enumerate() {
            for lower in c.to_lowercase() {
                chars.push(lower);
                origin.push(i);
            }
        }
        Self { chars, origin }
    }

    fn is_boundary(&self, at: usize) -> bool {
        at == 0 || at >= self.chars.len() || self.origin[at - 1] != self.origin[at]
    }

    /// Next occurrence at or after `start` that covers whole source chars,
    /// as a source char range.
    fn find_from(&self, needle: &[char], mut start: usize) -> Option<(usize, usize, usize)> {
        while start + needle.len() <= self.chars.len() {
            let offset = self.chars[start..]
                .windows(needle.len())
                .position(|window| window == needle)?;
            let at = start + offset;
            let end = at + needle.len();
            if self.is_boundary(at) && self.is_boundary(end) {
                return Some((self.origin[at], self.origin[end - 1] + 1, end));
            }
            start = at + 1;
        }
        None
    }
}

fn find_matches(content: &str, query: &str, limits: &SearchLimits) -> Vec<SearchMatch> {
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    let mut matches = Vec::new();
    if needle.is_empty() {
        return matches;
    }

    for (line_index, line) in content.split('\n').enumerate() {
        if matches.len() >= limits.max_matches_per_file {
            break;
        }
        let chars: Vec<char> = line.chars().collect();
        let lowered = LoweredLine::new(&chars);

        let mut start = 0;
        let mut on_line = 0;
        while on_line < limits.max_matches_per_line
            && matches.len() < limits.max_matches_per_file
        {
            let Some((position, end, resume)) = lowered.find_from(&needle, start) else {
                break;
            };
            let context_start = position.saturating_sub(limits.context_radius);
            let context_end = (end + limits.context_radius).min(chars.len());
            let snippet: String = chars[context_start..context_end].iter().collect();

            matches.push(SearchMatch {
                line: line_index + 1,
                column: position + 1,
                text: chars[position..end].iter().collect(),
                context: if context_start > 0 {
                    format!("...{}", snippet)
                } else {
                    snippet
                },
            });

            on_line += 1;
            start = resume;
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ProjectLoader;

    fn encode(text: &str) -> String {
        ContentDecoder::new().encode(text)
    }

    fn archive_of(children: &str) -> Archive {
        let json = format!(
            r#"{{"project":{{"name":"P","type":"directory","created_at":"t","children":{}}}}}"#,
            children
        );
        ProjectLoader::new().load_project(&json).unwrap()
    }

    fn file(name: &str, text: &str) -> String {
        format!(
            r#"{{"name":"{}","type":"file","content_base64":"{}"}}"#,
            name,
            encode(text)
        )
    }

    #[test]
    fn test_demo_search_for_foo() {
        let archive = ProjectLoader::new()
            .load_project(r#"{"project":{"name":"Demo","type":"directory","created_at":"2024-01-01T00:00:00Z","children":[{"name":"a.py","type":"file","content_base64":"ZGVmIGZvbygpOgogICAgcGFzcw=="}]}}"#)
            .unwrap();
        let results = SearchEngine::new().search(&archive, "foo");
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.path, "a.py");
        assert_eq!(result.file_name, "a.py");
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].line, 1);
        assert_eq!(result.matches[0].column, 5);
        assert_eq!(result.matches[0].text, "foo");
        assert_eq!(result.matches[0].context, "def foo():");
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let archive = archive_of(&format!("[{}]", file("a.txt", "hello")));
        let mut engine = SearchEngine::new();
        assert!(engine.search(&archive, "").is_empty());
        assert!(engine.search(&archive, "   \t").is_empty());
        assert!(engine.get_index_stats().is_none());
    }

    #[test]
    fn test_case_insensitive_preserves_original_text() {
        let archive = archive_of(&format!("[{}]", file("notes.txt", "Say HeLLo to hello")));
        let results = SearchEngine::new().search(&archive, "HELLO");
        let texts: Vec<_> = results[0].matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["HeLLo", "hello"]);
        assert_eq!(results[0].matches[1].column, 14);
    }

    #[test]
    fn test_match_caps_and_non_overlap() {
        let limits = SearchLimits::default();
        let capped = find_matches(&"x x x x x\n".repeat(10), "x", &limits);
        assert_eq!(capped.len(), 20);
        assert!(capped.iter().filter(|m| m.line == 1).count() == 3);

        let overlapping = find_matches("aaaa", "aa", &limits);
        let columns: Vec<_> = overlapping.iter().map(|m| m.column).collect();
        assert_eq!(columns, vec![1, 3]);
    }

    #[test]
    fn test_expanding_lowercase_matches_whole_chars_only() {
        let limits = SearchLimits::default();
        assert!(find_matches("plain i here", "\u{130}", &limits).is_empty());

        let matches = find_matches("x \u{130}stanbul y", "\u{130}STANBUL", &limits);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].column, 3);
        assert_eq!(matches[0].text, "\u{130}stanbul");
        assert_eq!(matches[0].text.to_lowercase(), "\u{130}STANBUL".to_lowercase());

        // "i" alone must not match half of the two-char lowering of U+0130
        assert!(find_matches("\u{130}", "i", &limits).is_empty());
    }

    #[test]
    fn test_undecodable_file_is_left_out_of_content_index() {
        let archive = Archive::new(
            "P".to_string(),
            None,
            "t".to_string(),
            vec![
                ArchiveNode::file("broken.txt", Some("@@@@".to_string())),
                ArchiveNode::file("good.txt", Some(encode("a good line"))),
            ],
        );
        let mut engine = SearchEngine::new();
        let results = engine.search(&archive, "good");
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["good.txt"]);
        assert_eq!(results[0].matches[0].line, 1);

        let stats = engine.get_index_stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_content, 1);

        let by_name = engine.search(&archive, "broken");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].matches[0].context, "File name match: broken.txt");
    }

    #[test]
    fn test_context_window() {
        let line = format!("{}needle{}", "a".repeat(30), "b".repeat(30));
        let matches = find_matches(&line, "needle", &SearchLimits::default());
        assert_eq!(matches[0].column, 31);
        assert_eq!(
            matches[0].context,
            format!("...{}needle{}", "a".repeat(20), "b".repeat(20))
        );
    }

    #[test]
    fn test_name_matches_follow_content_matches() {
        let archive = archive_of(&format!(
            r#"[{{"name":"components","type":"directory","children":[{}]}}, {}]"#,
            file("Button.tsx", "export const Button = () => null;"),
            file("readme.md", "Reusable components live here")
        ));
        let results = SearchEngine::new().search(&archive, "comp");
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["readme.md", "components"]);
        assert_eq!(results[1].matches[0].context, "File name match: components");
        assert!(results[1].content.is_empty());
    }

    #[test]
    fn test_file_name_match_keeps_original_case() {
        let archive = archive_of(r#"[{"name":"userProfile_view.ts","type":"file"}]"#);
        let results = SearchEngine::new().search(&archive, "PROFILE");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches[0].text, "userProfile_view.ts");
        assert_eq!(results[0].matches[0].column, 0);
    }

    #[test]
    fn test_result_cap() {
        let files: Vec<_> = (0..60).map(|i| file(&format!("f{}.txt", i), "needle")).collect();
        let archive = archive_of(&format!("[{}]", files.join(",")));
        let results = SearchEngine::new().search(&archive, "needle");
        assert_eq!(results.len(), 50);
        assert_eq!(results[0].path, "f0.txt");
    }

    #[test]
    fn test_binary_files_are_name_searchable_only() {
        let payload = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b"needle\0\0\0",
        );
        let archive = archive_of(&format!(
            r#"[{{"name":"needle.bin","type":"file","content_base64":"{}"}}]"#,
            payload
        ));
        let mut engine = SearchEngine::new();
        let results = engine.search(&archive, "needle");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches[0].line, 0);
        assert_eq!(engine.get_index_stats().unwrap().total_content, 0);
    }

    #[test]
    fn test_every_result_contains_query() {
        let archive = archive_of(&format!(
            r#"[{}, {}, {{"name":"docs","type":"directory","children":[{}]}}]"#,
            file("main.rs", "fn main() {\n    println!(\"Hello\");\n}"),
            file("lib_utils.rs", "pub fn helper() {}"),
            file("guide.md", "Main guide with HELP text")
        ));
        let mut engine = SearchEngine::new();
        for query in ["main", "help", "rs", "DOCS", "utils", "o"] {
            let q = query.to_lowercase();
            for result in engine.search(&archive, query) {
                let content_hit = result.matches.iter().any(|m| m.text.to_lowercase() == q);
                let name_hit = result.file_name.to_lowercase().contains(&q)
                    || result.matches.iter().any(|m| m.text.contains(&q));
                assert!(content_hit || name_hit, "{} for {:?}", result.path, query);
            }
        }
    }

    #[test]
    fn test_index_rebuilds_for_new_archive() {
        let first = archive_of(&format!("[{}]", file("a.txt", "alpha")));
        let second = archive_of(&format!("[{}, {}]", file("b.txt", "beta"), file("c.txt", "gamma")));
        let mut engine = SearchEngine::new();

        assert_eq!(engine.search(&first, "alpha").len(), 1);
        assert_eq!(engine.get_index_stats().unwrap().total_files, 1);

        assert!(engine.search(&second, "alpha").is_empty());
        let stats = engine.get_index_stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_content, 2);
        assert_eq!(stats.index_size, 9);

        engine.clear_index();
        assert!(engine.get_index_stats().is_none());
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("SearchEngine.ts"),
            vec!["searchengine.ts", "searchengine", "ts", "search", "engine.ts"]
        );
        assert_eq!(
            extract_keywords("my-file_name.rs"),
            vec!["my-file_name.rs", "my-file_name", "rs", "my", "file", "name.rs"]
        );
        assert_eq!(extract_keywords("Makefile"), vec!["makefile", "makefile"]);
    }
}
