//! Entity handles
//!
//! Operators, ports and links live in indexed containers inside the graph and
//! are referred to by these small `Copy` handles instead of references.
//!
//! Every handle type draws from its own process-wide counter, so a handle
//! never aliases an entity of a different graph. Looking up a handle that
//! belongs elsewhere (or was removed) reports `NotFound` rather than
//! silently resolving to the wrong entity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique handle.
            pub fn new() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw handle value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of an operator (a node of the graph).
    OperatorId,
    "op"
);

define_id!(
    /// Identity of an input port.
    InletId,
    "inlet"
);

define_id!(
    /// Identity of an output port.
    OutletId,
    "outlet"
);

define_id!(
    /// Identity of a link between an outlet and an inlet.
    LinkId,
    "link"
);
