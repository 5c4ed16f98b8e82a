//! Markdown serialization and parsing
//!
//! Lines are normalised through the same block splitter used for import, so
//! serializing, re-parsing and serializing again yields identical text.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use pulldown_cmark::{Event, Options, Parser};
use regex::Regex;

use crate::models::{Line, Resource};
use crate::outline::heading_of;

/// Knobs applied while serializing
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Relative directory that `attachment:` references are rewritten to
    pub attachments_dir: String,
    /// Keep only headings and lines carrying `==highlight==` markup
    pub highlights_only: bool,
    /// Turn escaped `\[` and `\]` into plain brackets
    pub convert_square_brackets: bool,
    /// Note URI → sibling export filename, for link-mode exports
    pub link_targets: BTreeMap<String, String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            attachments_dir: "attachments".to_string(),
            highlights_only: false,
            convert_square_brackets: false,
            link_targets: BTreeMap::new(),
        }
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

fn attachment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(attachment:([A-Za-z0-9_-]+)\)").expect("valid regex")
    })
}

fn highlight_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"==[^=\n]+==").expect("valid regex"))
}

/// Split Markdown text into top-level blocks
///
/// Each block becomes one line, trailing whitespace trimmed. Blank input
/// yields no lines. Text the parser emits no events for, such as link
/// reference definitions, is kept as blocks of its own.
pub fn parse_markdown(text: &str) -> Vec<Line> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut covered = 0usize;

    for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
        let top_level = match event {
            Event::Start(_) => {
                depth += 1;
                depth == 1
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        };
        if top_level {
            if range.start > covered {
                blocks.extend(uncovered_blocks(&text[covered..range.start]));
            }
            covered = covered.max(range.end);
            blocks.push(text[range].trim_end().to_string());
        }
    }
    if covered < text.len() {
        blocks.extend(uncovered_blocks(&text[covered..]));
    }

    blocks
        .into_iter()
        .filter(|block| !block.trim().is_empty())
        .collect()
}

/// Runs of non-blank lines between parsed blocks
fn uncovered_blocks(gap: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in gap.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

/// Whether plain text looks like Markdown worth parsing
pub fn looks_like_markdown(text: &str) -> bool {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?m)^#",
            r"(?m)^\s*[-+*]\s",
            r"(?m)^\d+\.\s",
            r"\[.*\]\(.*\)",
            r"`[^`]+`",
            r"(?m)^> ",
            r"```",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    });
    patterns.iter().any(|p| p.is_match(text))
}

/// Resources referenced by `attachment:` links in `lines`, each once
pub fn referenced_resources<'a>(lines: &[Line], resources: &'a [Resource]) -> Vec<&'a Resource> {
    let keys: HashSet<&str> = lines
        .iter()
        .flat_map(|line| attachment_pattern().captures_iter(line))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect();

    resources
        .iter()
        .filter(|r| keys.contains(r.key.as_str()))
        .collect()
}

/// Serialize resolved lines to Markdown
pub fn serialize_markdown(lines: &[Line], resources: &[Resource], options: &MarkdownOptions) -> String {
    let blocks: Vec<Line> = lines
        .iter()
        .filter(|line| !options.highlights_only || is_highlight_line(line))
        .map(|line| rewrite_line(line, resources, options))
        .flat_map(|line| parse_markdown(&line))
        .collect();

    if blocks.is_empty() {
        return String::new();
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn is_highlight_line(line: &str) -> bool {
    heading_of(line).is_some() || highlight_pattern().is_match(line)
}

fn rewrite_line(line: &str, resources: &[Resource], options: &MarkdownOptions) -> String {
    let mut line = attachment_pattern()
        .replace_all(line, |caps: &regex::Captures| {
            let alt = &caps[1];
            match resources.iter().find(|r| r.key == caps[2]) {
                Some(resource) => format!(
                    "![{}]({}/{})",
                    alt,
                    options.attachments_dir.trim_end_matches('/'),
                    resource.filename.replace(' ', "%20")
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    for (uri, filename) in &options.link_targets {
        if line.contains(uri.as_str()) {
            line = line.replace(uri.as_str(), &filename.replace(' ', "%20"));
        }
    }

    if options.convert_square_brackets {
        line = line.replace("\\[", "[").replace("\\]", "]");
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<Line> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_splits_top_level_blocks() {
        let text = "# Title\n\nFirst paragraph\nstill first\n\n- a\n- b\n\n```\ncode\n\nmore\n```\n";
        assert_eq!(
            parse_markdown(text),
            lines(&[
                "# Title",
                "First paragraph\nstill first",
                "- a\n- b",
                "```\ncode\n\nmore\n```"
            ])
        );
        assert!(parse_markdown("  \n\n").is_empty());
    }

    #[test]
    fn test_reference_definitions_survive_round_trip() {
        let note = lines(&[
            "See [the paper][p] and [the code][c].",
            "[p]: https://example.org/paper",
            "[c]: https://example.org/code \"Source\"\n[^1]: https://example.org/footnote",
        ]);
        let options = MarkdownOptions::default();

        let first = serialize_markdown(&note, &[], &options);
        assert_eq!(
            first,
            "See [the paper][p] and [the code][c].\n\n\
             [p]: https://example.org/paper\n\n\
             [c]: https://example.org/code \"Source\"\n[^1]: https://example.org/footnote\n"
        );
        let second = serialize_markdown(&parse_markdown(&first), &[], &options);
        assert_eq!(first, second);

        assert_eq!(
            parse_markdown("Intro\n\n[p]: https://example.org/paper\n\n# Next\n"),
            lines(&["Intro", "[p]: https://example.org/paper", "# Next"])
        );
    }

    #[test]
    fn test_serialize_joins_blocks() {
        let out = serialize_markdown(
            &lines(&["# Intro", "content line", "# End"]),
            &[],
            &MarkdownOptions::default(),
        );
        assert_eq!(out, "# Intro\n\ncontent line\n\n# End\n");
        assert_eq!(serialize_markdown(&[], &[], &MarkdownOptions::default()), "");
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let resolved = lines(&[
            "# Notes  ",
            "Some *emphasis* and a [link](zotero://note/1/AAAA/)",
            "- one",
            "- two",
            "> quoted\n> text",
            "| a | b |\n|---|---|\n| 1 | 2 |",
            "```rust\nfn main() {}\n\n// tail\n```",
            "",
            "---",
        ]);
        let options = MarkdownOptions::default();

        let first = serialize_markdown(&resolved, &[], &options);
        let reparsed = parse_markdown(&first);
        let second = serialize_markdown(&reparsed, &[], &options);

        assert_eq!(first, second);
    }

    #[test]
    fn test_attachments_are_rewritten() {
        let resources = vec![Resource::new("IMG1", "figure one.png", vec![1])];
        let out = serialize_markdown(
            &lines(&["![Figure](attachment:IMG1) ![x](attachment:NOPE)"]),
            &resources,
            &MarkdownOptions::default(),
        );
        assert_eq!(
            out,
            "![Figure](attachments/figure%20one.png) ![x](attachment:NOPE)\n"
        );
    }

    #[test]
    fn test_highlights_only() {
        let options = MarkdownOptions {
            highlights_only: true,
            ..MarkdownOptions::default()
        };
        let out = serialize_markdown(
            &lines(&["# Title", "plain", "with ==marked== text", "## Sub"]),
            &[],
            &options,
        );
        assert_eq!(out, "# Title\n\nwith ==marked== text\n\n## Sub\n");
    }

    #[test]
    fn test_square_bracket_conversion() {
        let options = MarkdownOptions {
            convert_square_brackets: true,
            ..MarkdownOptions::default()
        };
        let out = serialize_markdown(&lines(&[r"\[1\] Citation"]), &[], &options);
        assert_eq!(out, "[1] Citation\n");
    }

    #[test]
    fn test_link_targets_become_file_links() {
        let mut options = MarkdownOptions::default();
        options
            .link_targets
            .insert("zotero://note/1/BBBB/".to_string(), "Other Note.md".to_string());

        let out = serialize_markdown(
            &lines(&["see [Other](zotero://note/1/BBBB/)"]),
            &[],
            &options,
        );
        assert_eq!(out, "see [Other](Other%20Note.md)\n");
    }

    #[test]
    fn test_referenced_resources() {
        let resources = vec![
            Resource::new("A", "a.png", vec![1]),
            Resource::new("B", "b.png", vec![2]),
        ];
        let used = referenced_resources(
            &lines(&["![](attachment:B)", "![again](attachment:B)"]),
            &resources,
        );
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].key, "B");
    }

    #[test]
    fn test_looks_like_markdown() {
        assert!(looks_like_markdown("# Heading"));
        assert!(looks_like_markdown("text\n- item"));
        assert!(looks_like_markdown("1. first"));
        assert!(looks_like_markdown("a [link](http://x)"));
        assert!(looks_like_markdown("use `code`"));
        assert!(looks_like_markdown("> quote"));
        assert!(!looks_like_markdown("just a sentence."));
    }
}
