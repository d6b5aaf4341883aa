//! Pipeline stage identities and the wrappers applied around them.

mod observer;
mod registry;

use std::fmt;

pub use observer::{StageEvent, StageObserver, StageStatus, TracingObserver};
pub use registry::{Announce, Passthrough, StageRegistry, StageWrapper};

#[cfg(test)]
mod tests;

/// Ordered steps of dataset assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Discover,
    Filter,
    Materialize,
    Construct,
    Write,
    Metadata,
    Extras,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Discover,
        Stage::Filter,
        Stage::Materialize,
        Stage::Construct,
        Stage::Write,
        Stage::Metadata,
        Stage::Extras,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Discover => "discover",
            Stage::Filter => "filter",
            Stage::Materialize => "materialize",
            Stage::Construct => "construct",
            Stage::Write => "write",
            Stage::Metadata => "metadata",
            Stage::Extras => "extras",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
