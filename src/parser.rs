//! TypeScript parsing via tree-sitter.
//!
//! Everything downstream (extraction, export scanning, validation) works over
//! a [`ParsedFile`], which keeps the parse tree together with the original
//! source bytes so node text can be recovered without re-reading the file.

use std::path::Path;

use tree_sitter::Language;

/// A parsed TypeScript source file.
///
/// The tree and source are kept together to allow multiple analysis passes
/// without re-parsing.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub line: usize,
    /// Start column (1-indexed).
    pub column: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            line: start.row + 1, // tree-sitter is 0-indexed
            column: start.column + 1,
        }
    }

    /// Check if a byte offset falls inside this span, boundary-inclusive.
    ///
    /// Editors treat a cursor sitting on either edge of a string literal as
    /// "inside" it for hover/completion, so both ends are inclusive.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start_byte <= offset && offset <= self.end_byte
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The TypeScript grammar.
pub fn language() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

/// Parse TypeScript source into a [`ParsedFile`].
///
/// Partial syntax errors still yield a valid tree containing ERROR nodes;
/// analysis passes simply see fewer recognizable shapes in those regions.
pub fn parse(path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language())?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse TypeScript source: {}", path.display()))?;

    Ok(ParsedFile {
        tree,
        source: source.to_vec(),
        path: path.to_string_lossy().to_string(),
    })
}
