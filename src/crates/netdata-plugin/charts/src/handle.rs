//! Opaque chart references.

use std::fmt;

/// A non-owning reference to a chart held by a registry.
///
/// Handles are cheap to copy and carry no chart data. The registry resolves
/// them to its own state, and a handle whose chart has been dropped simply
/// stops resolving: the slot's generation moves on, so a recycled slot never
/// answers to an old handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle {
    index: u32,
    generation: u32,
}

impl ChartHandle {
    /// Mint a handle. Only registries are expected to call this.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ChartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}
