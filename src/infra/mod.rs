// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Weight persistence shared by every model:
//
//   checkpoint.rs — Burnpack checkpoint files (burn-store),
//                   conventional file names, a JSON metadata
//                   sidecar, and load/save with the
//                   "missing file is not an error" rule
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Checkpoint files: paths, load, save
pub mod checkpoint;
