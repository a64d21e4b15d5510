use burn::data::dataset::Dataset;

use crate::domain::dialogue::DialoguePair;

/// In-memory dialogue pairs exposed through Burn's `Dataset` trait
/// so the `DataLoader` can index and shuffle them.
pub struct DialogueDataset {
    pairs: Vec<DialoguePair>,
}

impl DialogueDataset {
    pub fn new(pairs: Vec<DialoguePair>) -> Self { Self { pairs } }
}

impl Dataset<DialoguePair> for DialogueDataset {
    fn get(&self, index: usize) -> Option<DialoguePair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
