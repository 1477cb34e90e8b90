//! Flattened, index-addressable view of a paragraph's inline tree.
//!
//! All nodes live in one arena with parent indices. Leaves are listed in
//! depth-first order; containers without leaves never show up in that order.

use crate::error::{Error, Result};
use crate::model::{FieldKind, Font, HyperlinkKind, Image, Inline, Paragraph};

#[derive(Clone, Debug, PartialEq)]
pub enum Leaf<'d> {
    Word(&'d str),
    Blank,
    Tab,
    LineBreak,
    SoftHyphen,
    Symbol { symbol: char, count: u32 },
    Field(&'d FieldKind),
    Image(&'d Image),
    Bookmark(&'d str),
}

impl Leaf<'_> {
    /// Leaves that carry visible content and end a run of trailing blanks.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Leaf::Word(_) | Leaf::Symbol { .. } | Leaf::Field(_) | Leaf::Image(_)
        )
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind<'d> {
    Root,
    Formatted,
    Hyperlink {
        target: &'d str,
        kind: HyperlinkKind,
    },
    Leaf,
}

#[derive(Clone, Debug)]
pub struct Node<'d> {
    pub kind: NodeKind<'d>,
    pub parent: Option<usize>,
}

/// A leaf in reading order with its node and resolved font.
#[derive(Clone, Debug)]
struct LeafEntry<'d> {
    leaf: Leaf<'d>,
    node: usize,
    font: Font,
}

#[derive(Clone, Debug)]
pub struct InlineArena<'d> {
    nodes: Vec<Node<'d>>,
    leaves: Vec<LeafEntry<'d>>,
}

impl<'d> InlineArena<'d> {
    pub fn build(paragraph: &'d Paragraph) -> Result<Self> {
        let mut arena = InlineArena {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
            }],
            leaves: Vec::new(),
        };
        arena.push_children(0, &paragraph.content, &paragraph.format.font)?;
        Ok(arena)
    }

    fn push_node(&mut self, kind: NodeKind<'d>, parent: usize) -> usize {
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
        });
        self.nodes.len() - 1
    }

    fn push_leaf(&mut self, leaf: Leaf<'d>, parent: usize, font: &Font) {
        let node = self.push_node(NodeKind::Leaf, parent);
        self.leaves.push(LeafEntry {
            leaf,
            node,
            font: font.clone(),
        });
    }

    fn push_children(&mut self, parent: usize, content: &'d [Inline], font: &Font) -> Result<()> {
        for inline in content {
            match inline {
                Inline::Text { text } => self.push_text(parent, text, font),
                Inline::Tab => self.push_leaf(Leaf::Tab, parent, font),
                Inline::LineBreak => self.push_leaf(Leaf::LineBreak, parent, font),
                Inline::SoftHyphen => self.push_leaf(Leaf::SoftHyphen, parent, font),
                Inline::Symbol { symbol, count } => self.push_leaf(
                    Leaf::Symbol {
                        symbol: *symbol,
                        count: *count,
                    },
                    parent,
                    font,
                ),
                Inline::Field(kind) => self.push_leaf(Leaf::Field(kind), parent, font),
                Inline::Image(image) => self.push_leaf(Leaf::Image(image), parent, font),
                Inline::Bookmark { name } => self.push_leaf(Leaf::Bookmark(name), parent, font),
                Inline::Formatted {
                    font: over,
                    content,
                } => {
                    let node = self.push_node(NodeKind::Formatted, parent);
                    self.push_children(node, content, &font.apply(over))?;
                }
                Inline::Hyperlink {
                    target,
                    kind,
                    content,
                } => {
                    let target = target
                        .as_deref()
                        .filter(|t| !t.is_empty())
                        .ok_or_else(|| Error::Configuration("hyperlink has no target".into()))?;
                    let node = self.push_node(
                        NodeKind::Hyperlink {
                            target,
                            kind: *kind,
                        },
                        parent,
                    );
                    self.push_children(node, content, font)?;
                }
            }
        }
        Ok(())
    }

    /// Splits running text into words, single blanks, tabs, breaks and soft hyphens.
    fn push_text(&mut self, parent: usize, text: &'d str, font: &Font) {
        let mut word_start: Option<usize> = None;
        for (i, ch) in text.char_indices() {
            let leaf = match ch {
                ' ' => Some(Leaf::Blank),
                '\t' => Some(Leaf::Tab),
                '\n' => Some(Leaf::LineBreak),
                '\u{00AD}' => Some(Leaf::SoftHyphen),
                _ => None,
            };
            match leaf {
                Some(leaf) => {
                    if let Some(s) = word_start.take() {
                        self.push_leaf(Leaf::Word(&text[s..i]), parent, font);
                    }
                    self.push_leaf(leaf, parent, font);
                }
                None => {
                    word_start.get_or_insert(i);
                }
            }
        }
        if let Some(s) = word_start {
            self.push_leaf(Leaf::Word(&text[s..]), parent, font);
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, pos: usize) -> &Leaf<'d> {
        &self.leaves[pos].leaf
    }

    pub fn font(&self, pos: usize) -> &Font {
        &self.leaves[pos].font
    }

    pub fn node(&self, idx: usize) -> &Node<'d> {
        &self.nodes[idx]
    }

    /// Nearest hyperlink ancestor of the leaf at `pos`, as a node index.
    pub fn hyperlink_at(&self, pos: usize) -> Option<usize> {
        let mut current = self.nodes[self.leaves[pos].node].parent;
        while let Some(idx) = current {
            if let NodeKind::Hyperlink { .. } = self.nodes[idx].kind {
                return Some(idx);
            }
            current = self.nodes[idx].parent;
        }
        None
    }

    pub fn iter(&self) -> ParagraphIterator<'_, 'd> {
        ParagraphIterator {
            arena: self,
            pos: 0,
        }
    }

    pub fn iter_at(&self, pos: usize) -> ParagraphIterator<'_, 'd> {
        ParagraphIterator { arena: self, pos }
    }
}

/// Cursor over the leaves of an arena. Copying it saves the position, so
/// probes can run ahead without committing.
#[derive(Clone, Copy)]
pub struct ParagraphIterator<'a, 'd> {
    arena: &'a InlineArena<'d>,
    pos: usize,
}

impl<'a, 'd> ParagraphIterator<'a, 'd> {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.arena.len()
    }

    pub fn current(&self) -> Option<&'a Leaf<'d>> {
        (!self.is_done()).then(|| self.arena.leaf(self.pos))
    }

    pub fn font(&self) -> &'a Font {
        self.arena.font(self.pos)
    }

    pub fn advance(&mut self) {
        if !self.is_done() {
            self.pos += 1;
        }
    }

    pub fn peek_next(&self) -> Option<&'a Leaf<'d>> {
        let next = self.pos + 1;
        (next < self.arena.len()).then(|| self.arena.leaf(next))
    }

    pub fn is_first(&self) -> bool {
        self.pos == 0
    }

    pub fn is_last(&self) -> bool {
        self.pos + 1 == self.arena.len()
    }
}

impl<'a, 'd> Iterator for ParagraphIterator<'a, 'd> {
    type Item = (usize, &'a Leaf<'d>);

    fn next(&mut self) -> Option<Self::Item> {
        let leaf = self.current()?;
        let pos = self.pos;
        self.pos += 1;
        Some((pos, leaf))
    }
}
