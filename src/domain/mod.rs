// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the label hierarchy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs and functions
//
// Reference: Rust Book §5 (Structs), §8 (Collections)

/// One internal node of the class hierarchy
pub mod node;

pub use node::Node;
