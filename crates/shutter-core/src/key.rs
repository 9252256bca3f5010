//! Stable identity for widget invocations.
//!
//! A widget instance is addressed two ways. Its *identity* is a 64-bit hash of
//! parent identity + call-site + disambiguator + occurrence, reproducible
//! across frames for "the same" logical widget. Its [`WidgetKey`] is the
//! arena slot the state store assigned to that identity; the generation
//! counter makes keys held past unmount detectably stale instead of silently
//! aliasing a reused slot.

use crate::hash;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Arena handle for one mounted widget instance.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WidgetKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Static source position of a widget call, captured by [`call_site!`].
///
/// [`call_site!`]: crate::call_site
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct CallSite(pub(crate) u64);

impl CallSite {
    pub fn new(location: u64) -> Self {
        Self(location)
    }
}

/// Hashes a static source position into a call-site key.
///
/// Stable within a process run, which is all identity derivation needs.
pub fn location_key(file: &'static str, line: u32, column: u32) -> u64 {
    let mut hasher = hash::default::new();
    file.hash(&mut hasher);
    line.hash(&mut hasher);
    column.hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn hash_disambiguator<K: Hash>(key: &K) -> u64 {
    let mut hasher = hash::default::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Derives a child identity from its parent's identity and call data.
///
/// `occurrence` is the position-within-kind counter for repeated invocations
/// of the same call site + disambiguator during one evaluation; it keeps
/// un-keyed loop items distinct (reconciled by position) without scrambling
/// explicitly keyed items.
pub(crate) fn child_identity(
    parent: u64,
    location: u64,
    disambiguator: Option<u64>,
    occurrence: u32,
) -> u64 {
    let mut hasher = hash::default::new();
    parent.hash(&mut hasher);
    location.hash(&mut hasher);
    disambiguator.hash(&mut hasher);
    occurrence.hash(&mut hasher);
    hasher.finish()
}
