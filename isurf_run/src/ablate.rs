//! Hand-off seam for the corner-value consumer.

/// Consumer of the per-cell corner arrays after reconciliation.
///
/// The ablation collaborator implements this; the orchestrator verifies the
/// group match before handing anything over.
pub trait CornerSink {
    /// Grid group this sink was configured for.
    fn group(&self) -> usize;

    /// Take ownership of the per-cell corner values.
    fn store_corners(&mut self, cvalues: &[[u8; 8]]);
}
