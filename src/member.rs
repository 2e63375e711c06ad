//! Member declarations and resolved member descriptors.
//!
//! A [`Packable`](crate::Packable) type lists its members, in declaration order, into a
//! [`MemberSet`]. Each entry carries an accessor pair and an optional policy
//! [`Annotation`]. On first resolution the registry runs the selection policy over the set
//! and binds every included entry into a [`MemberDescriptor`] (for the generic strategy)
//! and a pair of typed steps (folded into the specialized procedure).

use crate::codec::{Codec, DynCodec, Strategy};
use crate::dispatch::resolve_member;
use crate::error::{PackError, Result};
use crate::policy::Annotation;
use crate::registry::Registry;
use crate::wire::Wire;
use std::any::{type_name, Any};
use std::fmt;
use std::io::{Read, Write};

/// One typed write step of a compiled procedure.
pub(crate) type WriteStep<T> = Box<dyn Fn(&T, &mut dyn Write, Strategy) -> Result<()> + Send + Sync>;
/// One typed read step of a compiled procedure.
pub(crate) type ReadStep<T> = Box<dyn Fn(&mut T, &mut dyn Read, Strategy) -> Result<()> + Send + Sync>;

/// The declaration-ordered member list of a type, before selection.
///
/// Filled by the derive macro, or by hand:
///
/// ```rust
/// use packable::{Annotation, MemberSet, Packable, Wire, Capabilities};
///
/// #[derive(Default)]
/// struct Session {
///     id: i64,
///     token: String,
///     cache: Vec<u8>,
/// }
///
/// impl Wire for Session {
///     fn capabilities() -> Capabilities<Self> {
///         Capabilities::none().with_codable(packable::dispatch::object_codec::<Self>)
///     }
/// }
///
/// impl Packable for Session {
///     fn declare(members: &mut MemberSet<Self>) {
///         members
///             .field("id", |s| &s.id, |s, v| s.id = v)
///             .field("token", |s| &s.token, |s, v| s.token = v)
///             .field_with("cache", Annotation::exclude(), |s| &s.cache, |s, v| s.cache = v);
///     }
/// }
/// ```
pub struct MemberSet<T> {
    decls: Vec<MemberDecl<T>>,
}

pub(crate) struct MemberDecl<T> {
    pub(crate) name: &'static str,
    pub(crate) annotation: Option<Annotation>,
    binding: Box<dyn MemberBinding<T>>,
}

impl<T: 'static> MemberSet<T> {
    pub(crate) fn new() -> Self {
        Self { decls: Vec::new() }
    }

    /// Declares an unannotated member.
    pub fn field<F: Wire>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> &mut Self {
        self.annotated(name, None, get, set)
    }

    /// Declares a member carrying a policy annotation.
    pub fn field_with<F: Wire>(
        &mut self,
        name: &'static str,
        annotation: Annotation,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> &mut Self {
        self.annotated(name, Some(annotation), get, set)
    }

    /// Declares a member with an optional annotation. Used by generated code.
    pub fn annotated<F: Wire>(
        &mut self,
        name: &'static str,
        annotation: Option<Annotation>,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> &mut Self {
        self.decls.push(MemberDecl {
            name,
            annotation,
            binding: Box::new(FieldBinding { get, set }),
        });
        self
    }

    /// Number of declared members, included or not.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Returns true if no member was declared.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub(crate) fn annotations(&self) -> Vec<Option<Annotation>> {
        self.decls.iter().map(|d| d.annotation).collect()
    }

    pub(crate) fn into_decls(self) -> Vec<MemberDecl<T>> {
        self.decls
    }
}

impl<T> MemberDecl<T> {
    pub(crate) fn bind(&self, registry: &Registry) -> Result<BoundMember<T>> {
        self.binding.bind(self.name, registry)
    }
}

/// A member bound to its codec, in both execution forms.
pub(crate) struct BoundMember<T> {
    pub(crate) descriptor: MemberDescriptor<T>,
    pub(crate) write_step: WriteStep<T>,
    pub(crate) read_step: ReadStep<T>,
}

trait MemberBinding<T>: Send + Sync {
    fn bind(&self, name: &'static str, registry: &Registry) -> Result<BoundMember<T>>;
}

struct FieldBinding<T, F> {
    get: fn(&T) -> &F,
    set: fn(&mut T, F),
}

impl<T: 'static, F: Wire> MemberBinding<T> for FieldBinding<T, F> {
    fn bind(&self, name: &'static str, registry: &Registry) -> Result<BoundMember<T>> {
        let codec: Codec<F> = resolve_member::<F>(registry)?;
        let (get, set) = (self.get, self.set);

        let write_codec = codec.clone();
        let write_step: WriteStep<T> = Box::new(move |target: &T, sink: &mut dyn Write, strategy: Strategy| {
            write_codec.write(get(target), sink, strategy)
        });

        let read_codec = codec.clone();
        let read_step: ReadStep<T> = Box::new(move |target: &mut T, source: &mut dyn Read, strategy: Strategy| {
            set(target, read_codec.read(source, strategy)?);
            Ok(())
        });

        Ok(BoundMember {
            descriptor: MemberDescriptor {
                name,
                declared_type: type_name::<F>(),
                is_value_type: F::IS_VALUE_TYPE,
                accessor: Box::new(FieldAccessor { get, set }),
                codec: DynCodec::from(codec),
            },
            write_step,
            read_step,
        })
    }
}

/// Type-erased get/set pair bound to the declaring type.
trait Accessor<T>: Send + Sync {
    fn get<'a>(&self, target: &'a T) -> &'a dyn Any;
    fn set(&self, target: &mut T, value: Box<dyn Any>) -> Result<()>;
}

struct FieldAccessor<T, F> {
    get: fn(&T) -> &F,
    set: fn(&mut T, F),
}

impl<T, F: Any> Accessor<T> for FieldAccessor<T, F> {
    fn get<'a>(&self, target: &'a T) -> &'a dyn Any {
        (self.get)(target)
    }

    fn set(&self, target: &mut T, value: Box<dyn Any>) -> Result<()> {
        let value = value.downcast::<F>().map_err(|_| {
            PackError::Internal(format!("decoded value is not a {}", type_name::<F>()))
        })?;
        (self.set)(target, *value);
        Ok(())
    }
}

/// One included member of a resolved type: where it lives and how it is encoded.
pub struct MemberDescriptor<T> {
    name: &'static str,
    declared_type: &'static str,
    is_value_type: bool,
    accessor: Box<dyn Accessor<T>>,
    codec: DynCodec,
}

impl<T> MemberDescriptor<T> {
    /// Member name as declared.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust name of the member's declared type.
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// Whether the member is written without a presence marker.
    pub fn is_value_type(&self) -> bool {
        self.is_value_type
    }

    /// Generic-strategy write: fetch through the erased accessor, encode through the
    /// erased codec.
    pub(crate) fn write(&self, target: &T, sink: &mut dyn Write, strategy: Strategy) -> Result<()> {
        self.codec.write(self.accessor.get(target), sink, strategy)
    }

    /// Generic-strategy read: decode into a boxed value, store through the erased accessor.
    pub(crate) fn read(&self, target: &mut T, source: &mut dyn Read, strategy: Strategy) -> Result<()> {
        let value = self.codec.read(source, strategy)?;
        self.accessor.set(target, value)
    }
}

impl<T> fmt::Debug for MemberDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("is_value_type", &self.is_value_type)
            .finish()
    }
}
