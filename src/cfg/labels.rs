//! Fresh, collision-free block label generation.

use std::collections::BTreeSet;

use super::block::BasicBlock;

/// Generates `anonymous<k>` labels that never collide with labels already
/// present in the function.
#[derive(Debug, Clone)]
pub struct LabelGenerator {
    used: BTreeSet<String>,
    count: usize,
}

impl LabelGenerator {
    /// Seed the generator with every label the blocks already carry.
    #[must_use]
    pub fn new(blocks: &[BasicBlock]) -> Self {
        let used = blocks
            .iter()
            .filter_map(|block| block.label().map(str::to_string))
            .collect();
        Self { used, count: 0 }
    }

    /// Produce the next unused label and record it as taken.
    pub fn next(&mut self) -> String {
        loop {
            let label = format!("anonymous{}", self.count);
            self.count += 1;
            if self.used.insert(label.clone()) {
                return label;
            }
        }
    }
}
