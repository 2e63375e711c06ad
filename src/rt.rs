// src/rt.rs

//! Runtime utilities for generated code (Macros).
//! Do not use directly.

use crate::codec::Codec;
use crate::dispatch::resolve_value;
use crate::error::{PackError, Result};
use crate::registry::Registry;
use crate::wire::Wire;
use std::any::type_name;
use std::fmt::Debug;

/// Bridge between a fieldless enum and its integer representation.
///
/// Implemented by `#[derive(Packable)]` on enums, using the `#[repr]` integer
/// (`i32` when none is given).
pub trait WireEnum: Wire {
    /// The discriminant type as written on the wire.
    type Repr: Wire + Debug + Copy;

    /// The discriminant of `self`.
    fn to_repr(&self) -> Self::Repr;

    /// The variant with discriminant `repr`, if there is one.
    fn from_repr(repr: Self::Repr) -> Option<Self>;
}

/// Wrapper resolver for derived enums: the discriminant, encoded as its integer type.
///
/// An unknown discriminant on read is a [`PackError::Format`].
pub fn enum_codec<E: WireEnum>(registry: &Registry) -> Result<Codec<E>> {
    let repr = resolve_value::<E::Repr>(registry)?;
    let repr_r = repr.clone();
    Ok(Codec::new(
        move |value: &E, sink, strategy| repr.write(&value.to_repr(), sink, strategy),
        move |source, strategy| {
            let raw = repr_r.read(source, strategy)?;
            E::from_repr(raw).ok_or_else(|| {
                PackError::Format(format!("{raw:?} is not a discriminant of {}", type_name::<E>()))
            })
        },
    ))
}
