// ============================================================
// Layer 3 — Node Domain Type
// ============================================================
// An internal node of the label taxonomy. Each node is a small
// classification problem of its own: "which of my children does
// this sample belong to?"
//
// Example (CIFAR-10 style tree):
//   root ── vehicle ── {airplane, ship, automobile, truck}
//        └─ animal  ── {bird, cat, deer, dog, frog, horse}
//
//   Node "root":    2 classes  → [[0,1,8,9], [2,3,4,5,6,7]]
//   Node "vehicle": 4 classes  → [[0], [8], [1], [9]]
//
// The position of a child in `children` is the class index the
// node's classifier predicts for it.

use serde::{Deserialize, Serialize};

/// One internal node of the class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque taxonomy identifier (a WordNet id for CIFAR/ImageNet trees)
    pub wnid: String,

    /// Child wnids in document order
    pub children: Vec<String>,

    /// One entry per child: the sorted leaf label indices under it
    pub classes: Vec<Vec<usize>>,
}

impl Node {
    pub fn new(
        wnid:     impl Into<String>,
        children: Vec<String>,
        classes:  Vec<Vec<usize>>,
    ) -> Self {
        debug_assert_eq!(children.len(), classes.len());
        Self { wnid: wnid.into(), children, classes }
    }

    /// Output width of this node's classifier.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Child position whose subtree contains leaf `label`, if any.
    pub fn class_of(&self, label: usize) -> Option<usize> {
        self.classes
            .iter()
            .position(|leaves| leaves.binary_search(&label).is_ok())
    }

    /// All leaf labels this node discriminates among, sorted.
    pub fn leaves(&self) -> Vec<usize> {
        let mut leaves: Vec<usize> = self.classes.iter().flatten().copied().collect();
        leaves.sort_unstable();
        leaves.dedup();
        leaves
    }
}
