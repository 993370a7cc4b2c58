//! Basic block representation and the linear-stream splitter.

use crate::ir::Item;

/// A non-empty ordered run of items with at most one leading label and at
/// most one trailing terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// The items, in program order.
    pub items: Vec<Item>,
}

impl BasicBlock {
    /// Build a block from items.
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Build a block holding a single label item.
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            items: vec![Item::label(label)],
        }
    }

    /// The block's label, when its first item is one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self.items.first() {
            Some(Item::Label { label }) => Some(label),
            _ => None,
        }
    }

    /// The block's last item.
    ///
    /// Blocks are never empty, but the accessor stays total for callers that
    /// build blocks by hand.
    #[must_use]
    pub fn last(&self) -> Option<&Item> {
        self.items.last()
    }
}

/// Split a linear instruction stream into basic blocks.
///
/// Scanning left to right, a block ends immediately before each label (the
/// label begins the next block) and immediately after each terminator. Empty
/// spans between adjacent boundaries produce no block, so concatenating the
/// result reproduces the input exactly.
#[must_use]
pub fn split_blocks(items: Vec<Item>) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<Item> = Vec::new();

    for item in items {
        if item.is_label() {
            if !current.is_empty() {
                blocks.push(BasicBlock::new(std::mem::take(&mut current)));
            }
            current.push(item);
        } else if item.is_terminator() {
            current.push(item);
            blocks.push(BasicBlock::new(std::mem::take(&mut current)));
        } else {
            current.push(item);
        }
    }

    if !current.is_empty() {
        blocks.push(BasicBlock::new(current));
    }

    blocks
}

/// Concatenate blocks back into a linear instruction stream.
#[must_use]
pub fn flatten_blocks(blocks: Vec<BasicBlock>) -> Vec<Item> {
    blocks.into_iter().flat_map(|block| block.items).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Op};

    fn instr(op: Op) -> Item {
        Item::Instr(Instruction::new(op))
    }

    #[test]
    fn test_split_straight_line() {
        let items = vec![instr(Op::Const), instr(Op::Add), instr(Op::Ret)];
        let blocks = split_blocks(items.clone());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].items, items);
    }

    #[test]
    fn test_split_on_label_and_terminator() {
        let items = vec![
            instr(Op::Const),
            Item::Instr(Instruction::jmp("next")),
            Item::label("next"),
            instr(Op::Add),
            instr(Op::Ret),
        ];
        let blocks = split_blocks(items);

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].label().is_none());
        assert!(blocks[0].last().unwrap().is_terminator());
        assert_eq!(blocks[1].label(), Some("next"));
    }

    #[test]
    fn test_split_adjacent_labels() {
        let items = vec![Item::label("a"), Item::label("b"), instr(Op::Ret)];
        let blocks = split_blocks(items);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].items.len(), 1);
        assert_eq!(blocks[0].label(), Some("a"));
        assert_eq!(blocks[1].label(), Some("b"));
    }

    #[test]
    fn test_split_trailing_span_without_terminator() {
        let items = vec![instr(Op::Ret), instr(Op::Const), instr(Op::Add)];
        let blocks = split_blocks(items);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].items.len(), 2);
    }

    #[test]
    fn test_flatten_reproduces_stream() {
        let items = vec![
            Item::label("entry"),
            instr(Op::Const),
            Item::Instr(Instruction::jmp("entry")),
            Item::label("tail"),
            instr(Op::Ret),
        ];
        let blocks = split_blocks(items.clone());
        assert_eq!(flatten_blocks(blocks), items);
    }
}
