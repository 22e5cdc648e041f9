//! Common traits for Asperity components.

use crate::nogood::{Nogood, NogoodContainer};

/// Sink for nogoods discovered incidentally, e.g. while evaluating an
/// external source.
pub trait NogoodSink {
    /// Accepts one discovered nogood.
    fn push_nogood(&mut self, nogood: Nogood);
}

impl NogoodSink for NogoodContainer {
    fn push_nogood(&mut self, nogood: Nogood) {
        self.add(nogood);
    }
}

impl NogoodSink for Vec<Nogood> {
    fn push_nogood(&mut self, nogood: Nogood) {
        self.push(nogood);
    }
}
