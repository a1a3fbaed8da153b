//! Fast hash map and hash set type aliases.
//!
//! Type aliases for [`FxHashMap`] and [`FxHashSet`] from the `rustc-hash`
//! crate. Keys in this workspace are short strings and object references
//! produced by a trusted collector, so the Fx hash is used instead of the
//! std `SipHash`.
//!
//! # Examples
//!
//! ```
//! use vw_core::{FxHashMap, fx_hash_map};
//!
//! let mut map: FxHashMap<&str, u32> = fx_hash_map();
//! map.insert("traverseFolders", 0);
//! assert_eq!(map.get("traverseFolders"), Some(&0));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
