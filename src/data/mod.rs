// ============================================================
// Layer 4 — Data
// ============================================================
// Turns the taxonomy files on disk into the ordered node list
// every model is sized from.
//
//   tree.xml + wnids.txt
//       │
//       ▼
//   hierarchy::get_nodes  → Vec<Node>, pre-order
//       │
//       ▼
//   hierarchy::dim        → total feature width
//
// Reference: Rust Book §8 (Collections)

/// Taxonomy loader
pub mod hierarchy;
