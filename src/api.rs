//! The main entry point for packing and unpacking.
//!
//! [`Packer`] binds a [`Registry`] to a set of [`PackOptions`]. `Packer::new()` uses the
//! global registry and the generic strategy; [`Packer::builder`] configures both.
//!
//! ```rust
//! use packable::{Packable, Packer, Strategy};
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Reading {
//!     sensor: String,
//!     value: i64,
//! }
//!
//! let packer = Packer::builder().strategy(Strategy::Specialized).build();
//! let reading = Reading { sensor: "t0".into(), value: -40 };
//!
//! let bytes = packer.to_bytes(&reading)?;
//! let back: Reading = packer.from_bytes(&bytes)?;
//! assert_eq!(back, reading);
//! # Ok::<(), packable::PackError>(())
//! ```

use crate::codec::Strategy;
use crate::dispatch::resolve_member;
use crate::error::Result;
use crate::inspector::TypeReport;
use crate::object::Packable;
use crate::registry::Registry;
use crate::wire::Wire;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Tunables for a [`Packer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PackOptions {
    /// How codable objects are driven. Does not affect the bytes produced.
    pub strategy: Strategy,
}

/// Packs and unpacks values against a registry.
#[derive(Debug, Clone)]
pub struct Packer {
    registry: Registry,
    options: PackOptions,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer {
    /// A packer on the global registry with default options.
    pub fn new() -> Self {
        Self {
            registry: Registry::global().clone(),
            options: PackOptions::default(),
        }
    }

    /// Creates a builder for configuring a packer.
    pub fn builder() -> PackerBuilder {
        PackerBuilder::default()
    }

    /// The registry this packer resolves types against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The active options.
    pub fn options(&self) -> PackOptions {
        self.options
    }

    /// Writes the included members of `value` to `sink`, in declaration order.
    ///
    /// On error, `sink` may hold a truncated prefix of the encoding.
    pub fn pack<T: Packable, W: Write + ?Sized>(&self, value: &T, sink: &mut W) -> Result<()> {
        let descriptor = self.registry.resolve::<T>()?;
        let mut sink = sink;
        descriptor.write(value, &mut sink, self.options.strategy)
    }

    /// Reads the included members of `T` from `source` into `target`. Members that are not
    /// encoded keep their current values.
    ///
    /// On error, `target` may be partially populated.
    pub fn unpack<T: Packable, R: Read + ?Sized>(&self, target: &mut T, source: &mut R) -> Result<()> {
        let descriptor = self.registry.resolve::<T>()?;
        let mut source = source;
        descriptor.read(target, &mut source, self.options.strategy)
    }

    /// Unpacks into a fresh default instance.
    pub fn unpack_new<T: Packable, R: Read + ?Sized>(&self, source: &mut R) -> Result<T> {
        let mut value = T::default();
        self.unpack(&mut value, source)?;
        Ok(value)
    }

    /// Packs `value` into a new buffer.
    pub fn to_bytes<T: Packable>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.pack(value, &mut buffer)?;
        Ok(buffer)
    }

    /// Unpacks a `T` from the front of `bytes`. Trailing bytes are ignored.
    pub fn from_bytes<T: Packable>(&self, mut bytes: &[u8]) -> Result<T> {
        self.unpack_new(&mut bytes)
    }

    /// Writes any dispatchable value, including the presence marker a reference type
    /// carries wherever it is nested.
    ///
    /// ```rust
    /// use packable::Packer;
    ///
    /// let packer = Packer::new();
    /// let mut buf = Vec::new();
    /// packer.write_value(&vec!["a".to_string()], &mut buf)?;
    /// assert_eq!(buf, [1, 1, 0, 0, 0, 1, 1, b'a']);
    /// # Ok::<(), packable::PackError>(())
    /// ```
    pub fn write_value<V: Wire, W: Write + ?Sized>(&self, value: &V, sink: &mut W) -> Result<()> {
        let codec = resolve_member::<V>(&self.registry)?;
        let mut sink = sink;
        codec.write(value, &mut sink, self.options.strategy)
    }

    /// Reads a value written by [`Packer::write_value`].
    pub fn read_value<V: Wire, R: Read + ?Sized>(&self, source: &mut R) -> Result<V> {
        let codec = resolve_member::<V>(&self.registry)?;
        let mut source = source;
        codec.read(&mut source, self.options.strategy)
    }

    /// Packs `value` to a file, replacing its contents.
    pub fn save<T: Packable, P: AsRef<Path>>(&self, path: P, value: &T) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.pack(value, &mut writer)?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), "packed value to file");
        Ok(())
    }

    /// Unpacks a `T` from the start of a file.
    pub fn load<T: Packable, P: AsRef<Path>>(&self, path: P) -> Result<T> {
        let mut reader = BufReader::new(File::open(path)?);
        self.unpack_new(&mut reader)
    }

    /// Resolves `T` and describes its wire layout.
    pub fn inspect<T: Packable>(&self) -> Result<TypeReport> {
        let descriptor = self.registry.resolve::<T>()?;
        Ok(TypeReport::from_descriptor(&descriptor))
    }
}

/// Builder for [`Packer`].
#[derive(Debug, Clone, Default)]
pub struct PackerBuilder {
    options: PackOptions,
    registry: Option<Registry>,
}

impl PackerBuilder {
    /// Sets the execution strategy.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.options.strategy = strategy;
        self
    }

    /// Replaces all options at once, e.g. with values loaded from a config file.
    pub fn options(mut self, options: PackOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses `registry` instead of the global one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Finishes the packer.
    pub fn build(self) -> Packer {
        Packer {
            registry: self
                .registry
                .unwrap_or_else(|| Registry::global().clone()),
            options: self.options,
        }
    }
}

/// Renders bytes as comma-separated hex literals: `0x01, 0xFF`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 6);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "0x{byte:02X}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_formatting() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x01]), "0x01");
        assert_eq!(hex_dump(&[0x00, 0xab, 0xff]), "0x00, 0xAB, 0xFF");
    }

    #[test]
    fn builder_defaults_to_global_registry_and_generic_strategy() {
        let packer = Packer::builder().build();
        assert_eq!(packer.options().strategy, Strategy::Generic);

        let private = Registry::new();
        let packer = Packer::builder()
            .registry(private.clone())
            .strategy(Strategy::Specialized)
            .build();
        assert_eq!(packer.options().strategy, Strategy::Specialized);
        assert_eq!(packer.registry().build_count(), private.build_count());
    }
}
