//! Defines the `Packable` trait for codable objects.
//!
//! A codable object is encoded as its included members, in declaration order, with no
//! header, type tag or member names. Usually derived:
//!
//! ```rust
//! use packable::Packable;
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let bytes = Point { x: 1, y: -1 }.to_bytes()?;
//! assert_eq!(bytes, [1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
//! assert_eq!(Point::from_bytes(&bytes)?, Point { x: 1, y: -1 });
//! # Ok::<(), packable::PackError>(())
//! ```

use crate::api::Packer;
use crate::error::Result;
use crate::member::MemberSet;
use crate::wire::Wire;
use std::io::{Read, Write};

/// A type whose members can be packed into and unpacked from a byte stream.
///
/// `Default` supplies the instance that nested objects are decoded into; members that are
/// not encoded keep their default values.
pub trait Packable: Wire + Default {
    /// Lists every member of the type, in declaration order.
    fn declare(members: &mut MemberSet<Self>);

    /// Packs `self` with the default [`Packer`].
    fn pack<W: Write>(&self, sink: &mut W) -> Result<()> {
        Packer::new().pack(self, sink)
    }

    /// Unpacks into `self` with the default [`Packer`].
    fn unpack<R: Read>(&mut self, source: &mut R) -> Result<()> {
        Packer::new().unpack(self, source)
    }

    /// Packs `self` into a fresh buffer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Packer::new().to_bytes(self)
    }

    /// Unpacks a new default instance from `bytes`. Trailing bytes are ignored.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Packer::new().from_bytes(bytes)
    }
}
