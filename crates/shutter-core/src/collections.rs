//! Hash map/set aliases used across the engine.
//!
//! The fast branch uses FxHash; `std-hash` switches everything back to the
//! standard library's SipHash for debugging hash-sensitive issues.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::hash_map::Entry;
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
    pub use std::collections::hash_map::Entry;
}
