//! Outline-tree export
//!
//! Turns the heading tree of a resolved note into a mind map. Body lines
//! are ignored; only heading names survive.

use serde::{Deserialize, Serialize};

use crate::models::OutlineNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    /// Number of nodes in this subtree, root included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MindMapNode::count).sum::<usize>()
    }
}

/// Build a mind map rooted at the note title
pub fn mind_map(title: &str, outline: &[OutlineNode]) -> MindMapNode {
    MindMapNode {
        name: title.to_string(),
        children: outline.iter().map(convert).collect(),
    }
}

fn convert(node: &OutlineNode) -> MindMapNode {
    MindMapNode {
        name: node.name.clone(),
        children: node.children.iter().map(convert).collect(),
    }
}

/// Pretty-printed JSON rendering
pub fn to_json(map: &MindMapNode) -> serde_json::Result<String> {
    serde_json::to_string_pretty(map)
}

/// FreeMind `.mm` rendering
pub fn to_freemind(map: &MindMapNode) -> String {
    let mut out = String::from("<map version=\"1.0.1\">\n");
    write_node(&mut out, map, 1);
    out.push_str("</map>\n");
    out
}

fn write_node(out: &mut String, node: &MindMapNode, depth: usize) {
    let indent = "  ".repeat(depth);
    if node.children.is_empty() {
        out.push_str(&format!("{}<node TEXT=\"{}\"/>\n", indent, escape_xml(&node.name)));
        return;
    }

    out.push_str(&format!("{}<node TEXT=\"{}\">\n", indent, escape_xml(&node.name)));
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
    out.push_str(&format!("{}</node>\n", indent));
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#xa;"),
            c => escaped.push(c),
        }
    }
    escaped
}
