use std::sync::Arc;

/// A data/mover socket that may alias between the two subsystems (the
/// `ndmpcopy` three-way case, `§5` Aliasing). Wrapping it in `Arc` turns
/// "close exactly once, attributable to whichever subsystem is halted last"
/// into ordinary `Arc` drop semantics instead of a pointer-equality check:
/// the underlying `socket2::Socket` closes its fd when the last clone drops.
pub type SharedSocket = Arc<socket2::Socket>;
