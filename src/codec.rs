//! Resolved codecs and execution strategies.
//!
//! A [`Codec<T>`] is the pair of closures that writes and reads one `T`. The dispatcher
//! produces them, the registry stores them inside descriptors, and both are immutable once
//! built: cloning a codec only bumps two reference counts.

use crate::error::{PackError, Result};
use crate::primitive::{WireRead, WireWrite};
use std::any::{type_name, Any};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// How a codable object's member sequence is driven.
///
/// Both strategies produce byte-identical output and read each other's streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// Walk the member descriptors on every call, moving values through `dyn Any`.
    #[default]
    Generic,
    /// Run the per-type procedure compiled once at first resolution.
    Specialized,
}

type WriteFn<T> = dyn Fn(&T, &mut dyn Write, Strategy) -> Result<()> + Send + Sync;
type ReadFn<T> = dyn Fn(&mut dyn Read, Strategy) -> Result<T> + Send + Sync;

/// The resolved write/read pair for values of type `T`.
pub struct Codec<T> {
    write: Arc<WriteFn<T>>,
    read: Arc<ReadFn<T>>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self {
            write: Arc::clone(&self.write),
            read: Arc::clone(&self.read),
        }
    }
}

impl<T> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec<{}>", type_name::<T>())
    }
}

impl<T: 'static> Codec<T> {
    /// Builds a codec from closures that take part in strategy propagation.
    pub fn new<W, R>(write: W, read: R) -> Self
    where
        W: Fn(&T, &mut dyn Write, Strategy) -> Result<()> + Send + Sync + 'static,
        R: Fn(&mut dyn Read, Strategy) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            write: Arc::new(write),
            read: Arc::new(read),
        }
    }

    /// Builds a leaf codec from plain functions, for registering primitives.
    ///
    /// ```rust
    /// use packable::{Codec, WireRead, WireWrite};
    ///
    /// let f64_codec = Codec::<f64>::from_fns(
    ///     |v, sink| sink.write_int64(v.to_bits() as i64),
    ///     |source| Ok(f64::from_bits(source.read_int64()? as u64)),
    /// );
    /// # let _ = f64_codec;
    /// ```
    pub fn from_fns(
        write: fn(&T, &mut dyn Write) -> Result<()>,
        read: fn(&mut dyn Read) -> Result<T>,
    ) -> Self {
        Self::new(move |v, sink, _| write(v, sink), move |source, _| read(source))
    }

    /// Writes `value` to `sink`.
    pub fn write(&self, value: &T, sink: &mut dyn Write, strategy: Strategy) -> Result<()> {
        (self.write)(value, sink, strategy)
    }

    /// Reads one value from `source`.
    pub fn read(&self, source: &mut dyn Read, strategy: Strategy) -> Result<T> {
        (self.read)(source, strategy)
    }

    /// Wraps a reference-typed codec with an always-present marker.
    ///
    /// A 0 marker on read means the producer had no value, which a non-optional Rust
    /// type cannot represent.
    pub(crate) fn presence_marked(self) -> Self {
        let inner_w = self.clone();
        let inner_r = self;
        Self::new(
            move |v, sink, strategy| {
                sink.write_int8(1)?;
                inner_w.write(v, sink, strategy)
            },
            move |source, strategy| match source.read_int8()? {
                0 => Err(PackError::UnexpectedAbsent(type_name::<T>())),
                _ => inner_r.read(source, strategy),
            },
        )
    }

    /// Lifts this codec to `Option<T>`: `None` is a single 0 byte, `Some` is 1 then the
    /// inner encoding.
    pub(crate) fn nullable(self) -> Codec<Option<T>> {
        let inner_w = self.clone();
        let inner_r = self;
        Codec::new(
            move |v: &Option<T>, sink, strategy| match v {
                None => sink.write_int8(0),
                Some(value) => {
                    sink.write_int8(1)?;
                    inner_w.write(value, sink, strategy)
                }
            },
            move |source, strategy| match source.read_int8()? {
                0 => Ok(None),
                _ => inner_r.read(source, strategy).map(Some),
            },
        )
    }

    /// Lifts this codec to `Box<T>` without changing the encoding.
    pub(crate) fn boxed(self) -> Codec<Box<T>> {
        let inner_w = self.clone();
        let inner_r = self;
        Codec::new(
            move |v: &Box<T>, sink, strategy| inner_w.write(v, sink, strategy),
            move |source, strategy| inner_r.read(source, strategy).map(Box::new),
        )
    }
}

type DynWriteFn = dyn Fn(&dyn Any, &mut dyn Write, Strategy) -> Result<()> + Send + Sync;
type DynReadFn = dyn Fn(&mut dyn Read, Strategy) -> Result<Box<dyn Any>> + Send + Sync;

/// A codec with its value type erased, driven by the generic strategy.
pub(crate) struct DynCodec {
    write: Box<DynWriteFn>,
    read: Box<DynReadFn>,
}

impl DynCodec {
    pub(crate) fn write(&self, value: &dyn Any, sink: &mut dyn Write, strategy: Strategy) -> Result<()> {
        (self.write)(value, sink, strategy)
    }

    pub(crate) fn read(&self, source: &mut dyn Read, strategy: Strategy) -> Result<Box<dyn Any>> {
        (self.read)(source, strategy)
    }
}

impl<T: Any> From<Codec<T>> for DynCodec {
    fn from(codec: Codec<T>) -> Self {
        let writer = codec.clone();
        let reader = codec;
        Self {
            write: Box::new(move |value: &dyn Any, sink: &mut dyn Write, strategy: Strategy| {
                let typed = value.downcast_ref::<T>().ok_or_else(|| {
                    PackError::Internal(format!("member value is not a {}", type_name::<T>()))
                })?;
                writer.write(typed, sink, strategy)
            }),
            read: Box::new(move |source: &mut dyn Read, strategy: Strategy| {
                let value = reader.read(source, strategy)?;
                Ok(Box::new(value) as Box<dyn Any>)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int32_codec() -> Codec<i32> {
        Codec::from_fns(|v, sink| sink.write_int32(*v), |source| source.read_int32())
    }

    #[test]
    fn nullable_writes_single_zero_for_none() {
        let codec = int32_codec().nullable();
        let mut buf = Vec::new();
        codec.write(&None, &mut buf, Strategy::Generic).ok();
        assert_eq!(buf, [0]);

        buf.clear();
        codec.write(&Some(5), &mut buf, Strategy::Generic).ok();
        assert_eq!(buf, [1, 5, 0, 0, 0]);
        assert_eq!(codec.read(&mut &buf[..], Strategy::Generic).ok(), Some(Some(5)));
    }

    #[test]
    fn presence_marked_rejects_absent() {
        let codec = int32_codec().presence_marked();
        let result = codec.read(&mut &[0u8][..], Strategy::Generic);
        assert!(matches!(result, Err(PackError::UnexpectedAbsent("i32"))));
    }

    #[test]
    fn dyn_codec_round_trips_through_any() {
        let erased = DynCodec::from(int32_codec());
        let mut buf = Vec::new();
        erased.write(&7i32, &mut buf, Strategy::Generic).ok();
        let back = erased.read(&mut &buf[..], Strategy::Generic).ok();
        assert_eq!(back.and_then(|b| b.downcast::<i32>().ok()).map(|b| *b), Some(7));

        let wrong = erased.write(&"nope", &mut buf, Strategy::Generic);
        assert!(matches!(wrong, Err(PackError::Internal(_))));
    }
}
