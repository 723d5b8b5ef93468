//! Small collection types for variable-cardinality data common in trading
//! systems: a batch of fills, a list of subscriptions, etc.

pub mod none_one_or_many;
pub mod one_or_many;

pub use none_one_or_many::NoneOneOrMany;
pub use one_or_many::OneOrMany;

/// Fast `IndexMap` using the FNV hasher, cheaper than SipHash for the short
/// string/integer keys (instrument symbols, exchange tags) used throughout.
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

/// Fast `IndexSet` using the FNV hasher.
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;
