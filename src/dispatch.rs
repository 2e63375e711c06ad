//! The polymorphic value dispatcher.
//!
//! Turns a Rust type into a [`Codec`] by trying, in order, an exact primitive-table match
//! and then the capabilities the type declares through [`Wire`]. The resolvers for the
//! composite capabilities (sequences, maps, codable objects, wrappers) live here too; each
//! one recurses into the dispatcher for its element, key, value or member types.

use crate::codec::Codec;
use crate::error::{PackError, Result};
use crate::object::Packable;
use crate::primitive::{WireRead, WireWrite};
use crate::registry::{Registry, Resolution};
use crate::wire::{KeyValueMap, Sequence, Wire};
use std::any::type_name;

/// Largest count used to size a collection before its elements have actually arrived.
const PREALLOC_ITEMS: usize = 4096;

/// Resolves the inner encoding of `T`, without any presence marker.
pub fn resolve_value<T: Wire>(registry: &Registry) -> Result<Codec<T>> {
    if let Some(codec) = registry.primitive::<T>() {
        return Ok(codec);
    }
    match T::capabilities().first() {
        Some(resolver) => resolver(registry),
        None => Err(PackError::UnsupportedType(type_name::<T>())),
    }
}

/// Resolves the codec used wherever `T` appears as a member, element, key or value:
/// the inner encoding, preceded by a presence marker unless `T` is a value type.
pub fn resolve_member<T: Wire>(registry: &Registry) -> Result<Codec<T>> {
    let codec = resolve_value::<T>(registry)?;
    if T::IS_VALUE_TYPE {
        Ok(codec)
    } else {
        Ok(codec.presence_marked())
    }
}

/// Wrapper resolver for `Option<T>`.
pub fn option_codec<T: Wire>(registry: &Registry) -> Result<Codec<Option<T>>> {
    Ok(resolve_value::<T>(registry)?.nullable())
}

/// Wrapper resolver for `Box<T>`; encodes exactly as `T`.
pub fn boxed_codec<T: Wire>(registry: &Registry) -> Result<Codec<Box<T>>> {
    Ok(resolve_value::<T>(registry)?.boxed())
}

/// Sequence resolver: int32 count, then each element via recursive dispatch.
pub fn sequence_codec<S: Sequence>(registry: &Registry) -> Result<Codec<S>> {
    let element = resolve_member::<S::Item>(registry)?;
    let element_r = element.clone();
    Ok(Codec::new(
        move |seq: &S, sink, strategy| {
            sink.write_int32(wire_count(seq.item_count())?)?;
            for item in seq.items() {
                element.write(item, &mut *sink, strategy)?;
            }
            Ok(())
        },
        move |source, strategy| {
            let count = read_count(&mut *source)?;
            let mut seq = S::with_capacity(count.min(PREALLOC_ITEMS));
            for _ in 0..count {
                seq.push_item(element_r.read(&mut *source, strategy)?);
            }
            Ok(seq)
        },
    ))
}

/// Map resolver: int32 count, then each key followed by its value. Entries are inserted
/// in stream order on read.
pub fn map_codec<M: KeyValueMap>(registry: &Registry) -> Result<Codec<M>> {
    let key = resolve_member::<M::Key>(registry)?;
    let value = resolve_member::<M::Value>(registry)?;
    let (key_r, value_r) = (key.clone(), value.clone());
    Ok(Codec::new(
        move |map: &M, sink, strategy| {
            sink.write_int32(wire_count(map.entry_count())?)?;
            for (k, v) in map.entries() {
                key.write(k, &mut *sink, strategy)?;
                value.write(v, &mut *sink, strategy)?;
            }
            Ok(())
        },
        move |source, strategy| {
            let count = read_count(&mut *source)?;
            let mut map = M::with_capacity(count.min(PREALLOC_ITEMS));
            for _ in 0..count {
                let k = key_r.read(&mut *source, strategy)?;
                let v = value_r.read(&mut *source, strategy)?;
                if !map.insert_entry(k, v) {
                    return Err(PackError::Format(format!(
                        "duplicate key in {}",
                        type_name::<M>()
                    )));
                }
            }
            Ok(map)
        },
    ))
}

/// Codable-object resolver: the nested type's own member sequence, with no framing.
///
/// When `T` is still being built on this thread (a self- or mutually-recursive type),
/// its descriptor is not visible yet; the returned codec then looks it up on first use.
pub fn object_codec<T: Packable>(registry: &Registry) -> Result<Codec<T>> {
    match registry.try_resolve::<T>()? {
        Resolution::Ready(descriptor) => {
            let reader = descriptor.clone();
            Ok(Codec::new(
                move |value: &T, sink, strategy| descriptor.write(value, sink, strategy),
                move |source, strategy| {
                    let mut value = T::default();
                    reader.read(&mut value, source, strategy)?;
                    Ok(value)
                },
            ))
        }
        Resolution::Pending => {
            let handle = registry.downgrade();
            let handle_r = handle.clone();
            Ok(Codec::new(
                move |value: &T, sink, strategy| {
                    handle.upgrade()?.resolve::<T>()?.write(value, sink, strategy)
                },
                move |source, strategy| {
                    let descriptor = handle_r.upgrade()?.resolve::<T>()?;
                    let mut value = T::default();
                    descriptor.read(&mut value, source, strategy)?;
                    Ok(value)
                },
            ))
        }
    }
}

fn wire_count(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| PackError::Format(format!("count {len} exceeds int32")))
}

fn read_count(source: &mut dyn std::io::Read) -> Result<usize> {
    let count = source.read_int32()?;
    usize::try_from(count).map_err(|_| PackError::Format(format!("negative count {count}")))
}
