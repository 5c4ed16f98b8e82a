//! Format serializers
//!
//! Pure functions from resolved lines to Markdown and from outline trees to
//! mind maps. Word-processor and paginated output are produced by an
//! external renderer, see [`crate::export::ExternalRenderer`].

pub mod markdown;
pub mod mindmap;

pub use markdown::{
    looks_like_markdown, parse_markdown, referenced_resources, serialize_markdown,
    MarkdownOptions,
};
pub use mindmap::{mind_map, to_freemind, MindMapNode};
