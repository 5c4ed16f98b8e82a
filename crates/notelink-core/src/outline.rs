//! Outline indexing
//!
//! Derives a heading tree from a note's lines. Each node covers the line
//! range from its heading to the line before the next heading of the same
//! or a shallower level. The outline is recomputed on every query.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::models::{InsertPosition, Line, OutlineNode};

/// Heading level and plain-text name of a line, if it is a heading
pub fn heading_of(line: &str) -> Option<(u8, String)> {
    let mut level = None;
    let mut name = String::new();

    for event in Parser::new(line) {
        match event {
            Event::Start(Tag::Heading { level: l, .. }) if level.is_none() => {
                level = Some(l as u8);
            }
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(text)
            | Event::Code(text)
            | Event::InlineHtml(text)
            | Event::Html(text)
                if level.is_some() =>
            {
                name.push_str(&text)
            }
            Event::SoftBreak | Event::HardBreak if level.is_some() => name.push(' '),
            // Only the first block of a line decides
            Event::Start(_) if level.is_none() => return None,
            _ => {}
        }
    }

    level.map(|l| (l, name.trim().to_string()))
}

/// Build the heading tree of a note in one pass
pub fn build_outline(lines: &[Line]) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut open: Vec<OutlineNode> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some((level, name)) = heading_of(line) else {
            continue;
        };

        while open.last().is_some_and(|top| top.level >= level) {
            if let Some(mut node) = open.pop() {
                node.end_index = index - 1;
                attach(node, &mut open, &mut roots);
            }
        }

        open.push(OutlineNode {
            level,
            name,
            line_index: index,
            end_index: index,
            children: Vec::new(),
        });
    }

    let last_index = lines.len().saturating_sub(1);
    while let Some(mut node) = open.pop() {
        node.end_index = last_index;
        attach(node, &mut open, &mut roots);
    }

    roots
}

fn attach(node: OutlineNode, open: &mut [OutlineNode], roots: &mut Vec<OutlineNode>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Pre-order listing of every node in the tree
pub fn flatten(nodes: &[OutlineNode]) -> Vec<&OutlineNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&OutlineNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Innermost section containing `line_index`
pub fn section_at(nodes: &[OutlineNode], line_index: usize) -> Option<&OutlineNode> {
    let node = nodes
        .iter()
        .find(|n| n.line_index <= line_index && line_index <= n.end_index)?;
    section_at(&node.children, line_index).or(Some(node))
}

/// Line index at which new content is inserted
///
/// Without a section the content goes after the last line.
pub fn insertion_index(
    section: Option<&OutlineNode>,
    position: InsertPosition,
    line_count: usize,
) -> usize {
    match (section, position) {
        (Some(node), InsertPosition::Start) => node.line_index + 1,
        (Some(node), InsertPosition::End) => node.end_index + 1,
        (None, _) => line_count,
    }
}

/// Display title of a note: first heading, else first non-empty line
pub fn title_from_lines(lines: &[Line]) -> String {
    if let Some(name) = lines.iter().find_map(|l| heading_of(l).map(|(_, name)| name)) {
        return name;
    }

    lines
        .iter()
        .map(|l| plain_text(l))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Strip inline markup from a line
pub fn plain_text(line: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(line) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => break,
            _ => {}
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<Line> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn node(level: u8, name: &str, line_index: usize, end_index: usize) -> OutlineNode {
        OutlineNode {
            level,
            name: name.to_string(),
            line_index,
            end_index,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_heading_detection() {
        assert_eq!(heading_of("# Intro"), Some((1, "Intro".to_string())));
        assert_eq!(heading_of("### Deep *dive*"), Some((3, "Deep dive".to_string())));
        assert_eq!(heading_of("plain text"), None);
        assert_eq!(heading_of("#hashtag"), None);
        assert_eq!(heading_of("- # not a heading"), None);
    }

    #[test]
    fn test_heading_keeps_inline_html() {
        assert_eq!(heading_of("# B & <C>"), Some((1, "B & <C>".to_string())));
        assert_eq!(
            heading_of("## Tag <kbd>Ctrl</kbd> `x`"),
            Some((2, "Tag <kbd>Ctrl</kbd> x".to_string()))
        );
    }

    #[test]
    fn test_flat_sections() {
        let outline = build_outline(&lines(&[
            "# X", "a", "b", "c", "d", "# Y", "e", "f", "g", "h",
        ]));
        assert_eq!(outline, vec![node(1, "X", 0, 4), node(1, "Y", 5, 9)]);
    }

    #[test]
    fn test_nested_sections() {
        let outline = build_outline(&lines(&[
            "# A", "intro", "## A.1", "text", "## A.2", "# B", "tail",
        ]));

        assert_eq!(outline.len(), 2);
        let a = &outline[0];
        assert_eq!((a.line_index, a.end_index), (0, 4));
        assert_eq!(a.children.len(), 2);
        assert_eq!((a.children[0].line_index, a.children[0].end_index), (2, 3));
        assert_eq!((a.children[1].line_index, a.children[1].end_index), (4, 4));
        assert_eq!((outline[1].line_index, outline[1].end_index), (5, 6));
    }

    #[test]
    fn test_deeper_heading_first_then_shallower() {
        let outline = build_outline(&lines(&["### deep", "x", "# top", "y"]));
        assert_eq!(outline, vec![node(3, "deep", 0, 1), node(1, "top", 2, 3)]);
    }

    #[test]
    fn test_no_headings_yields_empty_outline() {
        assert!(build_outline(&lines(&["just", "text"])).is_empty());
        assert!(build_outline(&[]).is_empty());
    }

    #[test]
    fn test_outline_is_idempotent() {
        let input = lines(&["# A", "## B", "x", "# C"]);
        assert_eq!(build_outline(&input), build_outline(&input));
    }

    #[test]
    fn test_insertion_index() {
        let x = node(1, "X", 0, 4);
        let y = node(1, "Y", 5, 9);

        assert_eq!(insertion_index(Some(&x), InsertPosition::Start, 10), 1);
        assert_eq!(insertion_index(Some(&x), InsertPosition::End, 10), 5);
        assert_eq!(insertion_index(Some(&y), InsertPosition::End, 10), 10);
        assert_eq!(insertion_index(None, InsertPosition::Start, 10), 10);
    }

    #[test]
    fn test_flatten_and_section_lookup() {
        let outline = build_outline(&lines(&["# A", "## A.1", "x", "# B"]));
        let names: Vec<_> = flatten(&outline).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A.1", "B"]);

        assert_eq!(section_at(&outline, 2).map(|n| n.name.as_str()), Some("A.1"));
        assert_eq!(section_at(&outline, 0).map(|n| n.name.as_str()), Some("A"));
        assert_eq!(section_at(&outline, 3).map(|n| n.name.as_str()), Some("B"));
    }

    #[test]
    fn test_title_from_lines() {
        assert_eq!(title_from_lines(&lines(&["intro", "## Heading"])), "Heading");
        assert_eq!(title_from_lines(&lines(&["", "**bold** start"])), "bold start");
        assert_eq!(title_from_lines(&[]), "");
    }
}
