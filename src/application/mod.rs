// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflows the CLI can run. Each use case takes a ModelConfig,
// drives the ml and infra layers, and returns plain data for
// Layer 1 to print.
//
// Rules for this layer:
//   - No model math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Errors are anyhow::Result with context
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// JSON model configuration
pub mod config;

/// Build a model and report its shape and checkpoints
pub mod summary_use_case;

/// Write fresh checkpoints at the conventional paths
pub mod export_use_case;
