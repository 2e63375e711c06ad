//! # Packable
//!
//! A compact binary object serialization framework. Annotate a struct with
//! `#[derive(Packable)]` and its members are written to any [`std::io::Write`] in declaration
//! order, with no headers, type tags or member names, and read back from any
//! [`std::io::Read`].
//!
//! ## Overview
//!
//! The wire format is positional. Producer and consumer must agree on the member layout of
//! every type out of band; reordering, adding or removing an included member breaks
//! compatibility with previously written bytes.
//!
//! ### Key Features
//!
//! *   **Declarative member selection:** `#[pack(exclude)]`, `#[pack(include)]` and the
//!     order-dependent `fall_through` modifier decide which members are encoded.
//! *   **Recursive dispatch:** members may be primitives, strings, byte blocks, other
//!     packable structs, ordered collections, maps, options, boxes or fieldless enums,
//!     nested to any depth. Self-recursive types are supported.
//! *   **Two strategies:** a generic, type-erased member walk and a specialized,
//!     per-type procedure compiled once on first use. Both produce the same bytes.
//! *   **Lazy, thread-safe metadata:** type descriptors are built on first use and cached in
//!     a [`Registry`]. Concurrent first uses of a type build it exactly once.
//! *   **Extensible primitives:** [`Registry::register_primitive`] teaches the codec types
//!     it has no built-in encoding for, such as `f64`.
//!
//! ## Wire Format
//!
//! | Element            | Encoding                                                  |
//! |--------------------|-----------------------------------------------------------|
//! | bool               | 1 byte, 0 or 1                                            |
//! | int8               | 1 byte                                                    |
//! | int16              | 2 bytes, low byte first                                   |
//! | int32              | two int16 halves, low half first                          |
//! | int64              | two int32 halves, low half first                          |
//! | byte block         | int32 length, then the raw bytes                          |
//! | string             | 7-bit-group variable-length byte count, then UTF-8        |
//! | reference member   | presence byte, then the inner encoding if present         |
//! | sequence           | int32 count, then each element                            |
//! | map                | int32 count, then each key followed by its value          |
//! | nested object      | its own members, no framing                               |
//!
//! Integers are therefore little-endian. Unsigned types share the encoding of the signed
//! type of the same width.
//!
//! ## Usage
//!
//! ```rust
//! use packable::{Packable, Packer};
//! use std::collections::BTreeMap;
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Inventory {
//!     owner: String,
//!     slots: Vec<Item>,
//!     counts: BTreeMap<String, i32>,
//!     #[pack(exclude)]
//!     dirty: bool,
//! }
//!
//! #[derive(Packable, Default, Debug, PartialEq)]
//! struct Item {
//!     id: u32,
//!     label: Option<String>,
//! }
//!
//! let inv = Inventory {
//!     owner: "ada".into(),
//!     slots: vec![Item { id: 1, label: None }, Item { id: 2, label: Some("key".into()) }],
//!     counts: BTreeMap::from([("arrows".into(), 12)]),
//!     dirty: true,
//! };
//!
//! let bytes = inv.to_bytes()?;
//! let back: Inventory = Packer::new().from_bytes(&bytes)?;
//! assert_eq!(back.slots, inv.slots);
//! assert!(!back.dirty); // excluded members keep their default
//! # Ok::<(), packable::PackError>(())
//! ```
//!
//! ## Safety and Error Handling
//!
//! * **No Unsafe:** the crate is `#![deny(unsafe_code)]`.
//! * **No Panics:** no `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** all failures correspond to a [`PackError`] variant.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets generated code refer to `packable::...` inside this crate's own tests and docs.
extern crate self as packable;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod error;
pub mod inspector;
pub mod member;
pub mod object;
pub mod policy;
pub mod primitive;
pub mod registry;
pub mod wire;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod dispatch;

// Private modules
mod wire_impls;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{hex_dump, PackOptions, Packer, PackerBuilder};
pub use codec::{Codec, Strategy};
pub use error::{PackError, Result};
pub use inspector::{MemberReport, TypeReport};
pub use member::{MemberDescriptor, MemberSet};
pub use object::Packable;
pub use policy::Annotation;
pub use primitive::{WireRead, WireWrite};
pub use registry::{Registry, TypeDescriptor};
pub use wire::{Capabilities, KeyValueMap, Sequence, Wire};

// Re-export the derive macro so it is accessible as `packable::Packable`
pub use packable_derive::Packable;
