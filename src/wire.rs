//! Capability declarations for dispatchable types.
//!
//! Every type that can appear as a member, a collection element, or a map key/value
//! implements [`Wire`]. The trait does not encode anything itself; it tells the dispatcher
//! whether the type is a value type (no presence marker) and which capabilities it offers
//! when the primitive table has no exact match for it.
//!
//! Capabilities are consulted in a fixed priority order:
//!
//! 1. **wrapper**: `Option<T>`, `Box<T>` and derived enums, which re-express another
//!    type's codec;
//! 2. **codable**: structs deriving [`Packable`](crate::Packable);
//! 3. **sequence**: ordered collections implementing [`Sequence`];
//! 4. **map**: key/value maps implementing [`KeyValueMap`].
//!
//! A type with no primitive codec and none of these capabilities fails resolution with
//! [`PackError::UnsupportedType`](crate::PackError::UnsupportedType).

use crate::codec::Codec;
use crate::error::Result;
use crate::registry::Registry;

/// Builds the codec for `T` against a registry. Plain function pointers keep capability
/// sets `Copy` and free of captured state.
pub type Resolver<T> = fn(&Registry) -> Result<Codec<T>>;

/// The capability set a type exposes to the dispatcher.
pub struct Capabilities<T> {
    pub(crate) wrapper: Option<Resolver<T>>,
    pub(crate) codable: Option<Resolver<T>>,
    pub(crate) sequence: Option<Resolver<T>>,
    pub(crate) map: Option<Resolver<T>>,
}

impl<T> Clone for Capabilities<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Capabilities<T> {}

impl<T> Default for Capabilities<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> std::fmt::Debug for Capabilities<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("wrapper", &self.wrapper.is_some())
            .field("codable", &self.codable.is_some())
            .field("sequence", &self.sequence.is_some())
            .field("map", &self.map.is_some())
            .finish()
    }
}

impl<T> Capabilities<T> {
    /// No capabilities: the type is served by the primitive table or not at all.
    pub const fn none() -> Self {
        Self {
            wrapper: None,
            codable: None,
            sequence: None,
            map: None,
        }
    }

    /// Declares a wrapper that re-expresses another type's codec.
    pub const fn with_wrapper(mut self, resolver: Resolver<T>) -> Self {
        self.wrapper = Some(resolver);
        self
    }

    /// Declares the codable-object capability.
    pub const fn with_codable(mut self, resolver: Resolver<T>) -> Self {
        self.codable = Some(resolver);
        self
    }

    /// Declares the ordered-collection capability.
    pub const fn with_sequence(mut self, resolver: Resolver<T>) -> Self {
        self.sequence = Some(resolver);
        self
    }

    /// Declares the key/value-map capability.
    pub const fn with_map(mut self, resolver: Resolver<T>) -> Self {
        self.map = Some(resolver);
        self
    }

    /// The first declared capability in dispatch priority order.
    pub(crate) fn first(&self) -> Option<Resolver<T>> {
        self.wrapper.or(self.codable).or(self.sequence).or(self.map)
    }
}

/// A type the dispatcher knows how to reason about.
pub trait Wire: Sized + Send + Sync + 'static {
    /// Value types never carry a presence marker on the wire.
    const IS_VALUE_TYPE: bool = false;

    /// Capabilities consulted when the primitive table has no exact match.
    fn capabilities() -> Capabilities<Self> {
        Capabilities::none()
    }
}

/// The ordered-collection capability: an int32 count, then every element.
pub trait Sequence: Wire {
    /// Element type, dispatched recursively.
    type Item: Wire;

    /// Number of elements.
    fn item_count(&self) -> usize;

    /// Elements in wire order.
    fn items(&self) -> Box<dyn Iterator<Item = &Self::Item> + '_>;

    /// An empty collection able to hold `capacity` elements.
    fn with_capacity(capacity: usize) -> Self;

    /// Appends one decoded element.
    fn push_item(&mut self, item: Self::Item);
}

/// The key/value-map capability: an int32 count, then each key followed by its value.
pub trait KeyValueMap: Wire {
    /// Key type, dispatched recursively.
    type Key: Wire;
    /// Value type, dispatched recursively.
    type Value: Wire;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Entries in wire order.
    fn entries(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;

    /// An empty map able to hold `capacity` entries.
    fn with_capacity(capacity: usize) -> Self;

    /// Inserts one decoded entry. Returns `false` if the key was already present.
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value) -> bool;
}
