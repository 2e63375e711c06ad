//! `Wire` implementations for standard Rust types.
//!
//! Scalars are value types. Whether a scalar is actually encodable depends on the primitive
//! table: the defaults cover `bool` and the 8/16/32/64-bit integers, and
//! [`Registry::register_primitive`](crate::Registry::register_primitive) can add codecs for
//! the rest (`f32`, `f64`, `char`, ...).
//!
//! `String`, collections and maps are reference types. `Vec<u8>` is matched by the primitive
//! table before its sequence capability is consulted, so it travels as a byte block.
//!
//! Map entries travel in iteration order. `IndexMap` keeps insertion order through a round
//! trip; `BTreeMap` sorts by key and `HashMap` order is unspecified.

use crate::dispatch::{boxed_codec, map_codec, option_codec, sequence_codec};
use crate::wire::{Capabilities, KeyValueMap, Sequence, Wire};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};

macro_rules! impl_wire_scalar {
    ($($t:ty),*) => {
        $(
            impl Wire for $t {
                const IS_VALUE_TYPE: bool = true;
            }
        )*
    }
}

impl_wire_scalar!(bool, u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize, f32, f64, char);

impl Wire for String {}

// --- WRAPPERS ---

/// `None` is a single 0 byte; `Some` is 1 followed by the inner encoding. The marker is the
/// `Option`'s own, so the wrapper itself counts as a value type.
impl<T: Wire> Wire for Option<T> {
    const IS_VALUE_TYPE: bool = true;

    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_wrapper(option_codec::<T>)
    }
}

impl<T: Wire> Wire for Box<T> {
    const IS_VALUE_TYPE: bool = T::IS_VALUE_TYPE;

    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_wrapper(boxed_codec::<T>)
    }
}

// --- SEQUENCES ---

impl<T: Wire> Wire for Vec<T> {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_sequence(sequence_codec::<Self>)
    }
}

impl<T: Wire> Sequence for Vec<T> {
    type Item = T;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn push_item(&mut self, item: T) {
        self.push(item);
    }
}

impl<T: Wire> Wire for VecDeque<T> {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_sequence(sequence_codec::<Self>)
    }
}

impl<T: Wire> Sequence for VecDeque<T> {
    type Item = T;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn items(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn with_capacity(capacity: usize) -> Self {
        VecDeque::with_capacity(capacity)
    }

    fn push_item(&mut self, item: T) {
        self.push_back(item);
    }
}

// --- MAPS ---

/// Entries are written in the map's iteration order, which for `HashMap` is unspecified.
impl<K, V, S> Wire for HashMap<K, V, S>
where
    K: Wire + Eq + Hash,
    V: Wire,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_map(map_codec::<Self>)
    }
}

impl<K, V, S> KeyValueMap for HashMap<K, V, S>
where
    K: Wire + Eq + Hash,
    V: Wire,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, S::default())
    }

    fn insert_entry(&mut self, key: K, value: V) -> bool {
        self.insert(key, value).is_none()
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_map(map_codec::<Self>)
    }
}

impl<K: Wire + Ord, V: Wire> KeyValueMap for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn with_capacity(_capacity: usize) -> Self {
        BTreeMap::new()
    }

    fn insert_entry(&mut self, key: K, value: V) -> bool {
        self.insert(key, value).is_none()
    }
}

impl<K, V, S> Wire for IndexMap<K, V, S>
where
    K: Wire + Eq + Hash,
    V: Wire,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none().with_map(map_codec::<Self>)
    }
}

impl<K, V, S> KeyValueMap for IndexMap<K, V, S>
where
    K: Wire + Eq + Hash,
    V: Wire,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn with_capacity(capacity: usize) -> Self {
        IndexMap::with_capacity_and_hasher(capacity, S::default())
    }

    fn insert_entry(&mut self, key: K, value: V) -> bool {
        self.insert(key, value).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Strategy;
    use crate::dispatch::{resolve_member, resolve_value};
    use crate::registry::Registry;

    #[test]
    fn option_of_reference_type_has_a_single_marker() {
        let registry = Registry::new();
        let codec = resolve_member::<Option<String>>(&registry).expect("option");

        let mut buf = Vec::new();
        codec.write(&None, &mut buf, Strategy::Generic).expect("none");
        codec
            .write(&Some("hi".into()), &mut buf, Strategy::Generic)
            .expect("some");
        assert_eq!(buf, [0, 1, 2, b'h', b'i']);

        let mut source = &buf[..];
        assert_eq!(codec.read(&mut source, Strategy::Generic).expect("none"), None);
        assert_eq!(
            codec.read(&mut source, Strategy::Generic).expect("some"),
            Some("hi".to_string())
        );
    }

    #[test]
    fn boxes_are_transparent() {
        let registry = Registry::new();
        let boxed = resolve_member::<Box<i32>>(&registry).expect("box");
        let mut buf = Vec::new();
        boxed.write(&Box::new(7), &mut buf, Strategy::Generic).expect("write");
        assert_eq!(buf, 7i32.to_le_bytes());
    }

    #[test]
    fn vec_deque_matches_vec_encoding() {
        let registry = Registry::new();
        let vec = resolve_value::<Vec<u16>>(&registry).expect("vec");
        let deque = resolve_value::<VecDeque<u16>>(&registry).expect("deque");

        let (mut a, mut b) = (Vec::new(), Vec::new());
        vec.write(&vec![1, 2, 3], &mut a, Strategy::Generic).expect("vec");
        deque
            .write(&VecDeque::from([1, 2, 3]), &mut b, Strategy::Generic)
            .expect("deque");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_map_round_trip() {
        let registry = Registry::new();
        let codec = resolve_value::<HashMap<String, i32>>(&registry).expect("map");
        let map = HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);

        let mut buf = Vec::new();
        codec.write(&map, &mut buf, Strategy::Generic).expect("write");
        // count + 2 * (marker + len + 1 char + int32)
        assert_eq!(buf.len(), 4 + 2 * (1 + 1 + 1 + 4));
        assert_eq!(codec.read(&mut &buf[..], Strategy::Generic).expect("read"), map);
    }

    #[test]
    fn index_map_keeps_insertion_order() {
        let registry = Registry::new();
        let codec = resolve_value::<IndexMap<String, i32>>(&registry).expect("map");
        let map = IndexMap::from([("z".to_string(), 26), ("a".to_string(), 1), ("m".to_string(), 13)]);

        let mut buf = Vec::new();
        codec.write(&map, &mut buf, Strategy::Generic).expect("write");
        assert_eq!(&buf[..4], 3i32.to_le_bytes());
        assert_eq!(&buf[4..7], [1, 1, b'z']);

        let back = codec.read(&mut &buf[..], Strategy::Generic).expect("read");
        let keys: Vec<_> = back.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(back, map);
    }
}
