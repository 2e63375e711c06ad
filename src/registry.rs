//! The type registry: a lazily populated, thread-safe metadata cache.
//!
//! ## Population Discipline
//!
//! [`Registry::resolve`] follows an acquire-check-acquire-build-publish sequence:
//!
//! 1. Look the type up under a shared read lock. Almost every call ends here.
//! 2. On a miss, take the build lock and look again, collapsing concurrent first uses.
//! 3. Still missing: build the descriptor, publish it under a short write lock, and only
//!    then release the build lock.
//!
//! The build lock is re-entrant because building one type resolves its member types,
//! which may need building too. A type whose own build is in progress on this thread is
//! not visible to itself; recursive references to it get a codec that looks the
//! descriptor up at call time instead.
//!
//! No lock is held while bytes are read or written. Published descriptors are immutable
//! and shared through `Arc`.
//!
//! Descriptors built inside another build are staged rather than published. The whole
//! batch becomes visible when the outermost build succeeds, so a nested descriptor never
//! escapes while a type it refers back to is still unresolved.
//!
//! ## Failure
//!
//! Nothing is published when a build fails, including descriptors staged by nested builds
//! of the same attempt, so a type with an unsupported member fails with the same
//! [`PackError::UnsupportedType`] on every attempt.

use crate::codec::{Codec, Strategy};
use crate::error::{PackError, Result};
use crate::member::{MemberDescriptor, MemberSet, ReadStep, WriteStep};
use crate::object::Packable;
use crate::policy::select_members;
use crate::primitive::{WireRead, WireWrite};
use crate::wire::Wire;
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, RwLock};
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type Erased = Arc<dyn Any + Send + Sync>;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// A cache of resolved type descriptors plus the primitive codec table.
///
/// `Registry` is a cheap handle: clones share the same cache. Most code uses
/// [`Registry::global`]; a private registry isolates custom primitive codecs or
/// build statistics.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    primitives: RwLock<HashMap<TypeId, Erased>>,
    descriptors: RwLock<HashMap<TypeId, Erased>>,
    building: ReentrantMutex<RefCell<BuildState>>,
    builds: AtomicUsize,
}

/// Build bookkeeping of the thread holding the build lock.
#[derive(Default)]
struct BuildState {
    in_progress: HashSet<TypeId>,
    /// Finished nested builds, waiting for the outermost build to succeed.
    staged: Vec<(TypeId, Erased)>,
}

impl BuildState {
    fn staged<T: Packable>(&self) -> Result<Option<Arc<TypeDescriptor<T>>>> {
        let key = TypeId::of::<T>();
        match self.staged.iter().find(|(staged, _)| *staged == key) {
            Some((_, erased)) => downcast_descriptor(Arc::clone(erased)).map(Some),
            None => Ok(None),
        }
    }
}

fn downcast_descriptor<T: Packable>(erased: Erased) -> Result<Arc<TypeDescriptor<T>>> {
    erased
        .downcast::<TypeDescriptor<T>>()
        .map_err(|_| PackError::Internal(format!("descriptor slot for {} holds another type", type_name::<T>())))
}

/// A non-owning registry handle, held by codecs of recursive types so that descriptors
/// do not keep their own registry alive.
#[derive(Clone)]
pub(crate) struct WeakRegistry(Weak<RegistryInner>);

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Result<Registry> {
        self.0
            .upgrade()
            .map(|inner| Registry { inner })
            .ok_or_else(|| PackError::Internal("registry dropped while a codec was in use".into()))
    }
}

/// Outcome of a resolution attempt made while descriptors may be mid-build.
pub(crate) enum Resolution<T> {
    Ready(Arc<TypeDescriptor<T>>),
    /// The type is being built further up this thread's stack.
    Pending,
}

impl Registry {
    /// Creates an empty registry preloaded with the default primitive codecs.
    pub fn new() -> Self {
        let registry = Self {
            inner: Arc::new(RegistryInner {
                primitives: RwLock::new(HashMap::new()),
                descriptors: RwLock::new(HashMap::new()),
                building: ReentrantMutex::new(RefCell::new(BuildState::default())),
                builds: AtomicUsize::new(0),
            }),
        };
        registry.install_default_primitives();
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Adds or replaces the exact-match codec for `T`.
    ///
    /// Descriptors are immutable once built, so register before the first pack or unpack
    /// of any type that contains a `T`.
    pub fn register_primitive<T: Wire>(&self, codec: Codec<T>) {
        self.inner
            .primitives
            .write()
            .insert(TypeId::of::<T>(), Arc::new(codec));
    }

    /// Returns the exact-match codec for `T`, if one is registered.
    pub fn primitive<T: Wire>(&self) -> Option<Codec<T>> {
        self.inner
            .primitives
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|erased| erased.downcast_ref::<Codec<T>>())
            .cloned()
    }

    /// Returns the descriptor for `T`, building and publishing it on first use.
    pub fn resolve<T: Packable>(&self) -> Result<Arc<TypeDescriptor<T>>> {
        match self.try_resolve::<T>()? {
            Resolution::Ready(descriptor) => Ok(descriptor),
            Resolution::Pending => Err(PackError::Internal(format!(
                "{} resolved from inside its own descriptor build",
                type_name::<T>()
            ))),
        }
    }

    /// Whether a descriptor for `T` has been published.
    pub fn is_resolved<T: Packable>(&self) -> bool {
        self.inner
            .descriptors
            .read()
            .contains_key(&TypeId::of::<T>())
    }

    /// Number of descriptors this registry has built and published.
    pub fn build_count(&self) -> usize {
        self.inner.builds.load(Ordering::Acquire)
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }

    pub(crate) fn try_resolve<T: Packable>(&self) -> Result<Resolution<T>> {
        if let Some(descriptor) = self.published::<T>()? {
            return Ok(Resolution::Ready(descriptor));
        }

        let state = self.inner.building.lock();
        if let Some(descriptor) = self.published::<T>()? {
            return Ok(Resolution::Ready(descriptor));
        }
        if let Some(descriptor) = state.borrow().staged::<T>()? {
            return Ok(Resolution::Ready(descriptor));
        }

        let key = TypeId::of::<T>();
        if !state.borrow_mut().in_progress.insert(key) {
            return Ok(Resolution::Pending);
        }
        let built = {
            let _mark = BuildMark { state: &state, key };
            TypeDescriptor::<T>::build(self)
        };
        let outermost = state.borrow().in_progress.is_empty();

        let descriptor = match built {
            Ok(descriptor) => Arc::new(descriptor),
            Err(e) => {
                let discarded = if outermost {
                    std::mem::take(&mut state.borrow_mut().staged).len()
                } else {
                    0
                };
                warn!(type_name = type_name::<T>(), error = %e, discarded, "type descriptor build failed");
                return Err(e);
            }
        };
        debug!(
            type_name = descriptor.type_name(),
            members = descriptor.members().len(),
            skipped = descriptor.skipped().len(),
            "built type descriptor"
        );

        let erased = Arc::clone(&descriptor) as Erased;
        if !outermost {
            state.borrow_mut().staged.push((key, erased));
            return Ok(Resolution::Ready(descriptor));
        }

        let mut batch = std::mem::take(&mut state.borrow_mut().staged);
        batch.push((key, erased));
        let count = batch.len();
        self.inner.descriptors.write().extend(batch);
        self.inner.builds.fetch_add(count, Ordering::AcqRel);
        debug!(type_name = descriptor.type_name(), count, "published type descriptors");
        Ok(Resolution::Ready(descriptor))
    }

    fn published<T: Packable>(&self) -> Result<Option<Arc<TypeDescriptor<T>>>> {
        let erased = match self.inner.descriptors.read().get(&TypeId::of::<T>()) {
            Some(erased) => Arc::clone(erased),
            None => return Ok(None),
        };
        downcast_descriptor(erased).map(Some)
    }

    fn install_default_primitives(&self) {
        self.register_primitive::<bool>(Codec::from_fns(|v, s| s.write_bool(*v), |s| s.read_bool()));
        self.register_primitive::<u8>(Codec::from_fns(|v, s| s.write_int8(*v), |s| s.read_int8()));
        self.register_primitive::<i8>(Codec::from_fns(
            |v, s| s.write_int8(*v as u8),
            |s| Ok(s.read_int8()? as i8),
        ));
        self.register_primitive::<i16>(Codec::from_fns(|v, s| s.write_int16(*v), |s| s.read_int16()));
        self.register_primitive::<u16>(Codec::from_fns(
            |v, s| s.write_int16(*v as i16),
            |s| Ok(s.read_int16()? as u16),
        ));
        self.register_primitive::<i32>(Codec::from_fns(|v, s| s.write_int32(*v), |s| s.read_int32()));
        self.register_primitive::<u32>(Codec::from_fns(
            |v, s| s.write_int32(*v as i32),
            |s| Ok(s.read_int32()? as u32),
        ));
        self.register_primitive::<i64>(Codec::from_fns(|v, s| s.write_int64(*v), |s| s.read_int64()));
        self.register_primitive::<u64>(Codec::from_fns(
            |v, s| s.write_int64(*v as i64),
            |s| Ok(s.read_int64()? as u64),
        ));
        self.register_primitive::<Vec<u8>>(Codec::from_fns(|v, s| s.write_bytes(v), |s| s.read_bytes()));
        self.register_primitive::<String>(Codec::from_fns(|v, s| s.write_string(v), |s| s.read_string()));
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("primitives", &self.inner.primitives.read().len())
            .field("descriptors", &self.inner.descriptors.read().len())
            .field("builds", &self.build_count())
            .finish()
    }
}

/// Clears the in-progress mark for a type when its build ends, successfully or not.
struct BuildMark<'a> {
    state: &'a RefCell<BuildState>,
    key: TypeId,
}

impl Drop for BuildMark<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().in_progress.remove(&self.key);
    }
}

type WriteProcedure<T> = WriteStep<T>;
type ReadProcedure<T> = ReadStep<T>;

/// The cached, immutable metadata of one codable type.
///
/// Holds the included members in wire order for the generic strategy, and the
/// write/read procedures compiled from the same members for the specialized strategy.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    members: Vec<MemberDescriptor<T>>,
    skipped: Vec<&'static str>,
    write_procedure: WriteProcedure<T>,
    read_procedure: ReadProcedure<T>,
}

impl<T: Packable> TypeDescriptor<T> {
    fn build(registry: &Registry) -> Result<Self> {
        let mut set = MemberSet::new();
        T::declare(&mut set);

        let included = select_members(&set.annotations());
        let mut members = Vec::with_capacity(included.len());
        let mut skipped = Vec::new();
        let mut write_procedure: WriteProcedure<T> = Box::new(|_: &T, _: &mut dyn Write, _: Strategy| Ok(()));
        let mut read_procedure: ReadProcedure<T> = Box::new(|_: &mut T, _: &mut dyn Read, _: Strategy| Ok(()));

        let mut next = included.iter().copied().peekable();
        for (index, decl) in set.into_decls().into_iter().enumerate() {
            if next.peek() != Some(&index) {
                skipped.push(decl.name);
                continue;
            }
            next.next();

            let bound = decl.bind(registry)?;
            members.push(bound.descriptor);

            let (prev_w, step_w) = (write_procedure, bound.write_step);
            write_procedure = Box::new(move |value: &T, sink: &mut dyn Write, strategy: Strategy| {
                prev_w(value, &mut *sink, strategy)?;
                step_w(value, sink, strategy)
            });
            let (prev_r, step_r) = (read_procedure, bound.read_step);
            read_procedure = Box::new(move |target: &mut T, source: &mut dyn Read, strategy: Strategy| {
                prev_r(&mut *target, &mut *source, strategy)?;
                step_r(target, source, strategy)
            });
        }

        Ok(Self {
            type_name: type_name::<T>(),
            members,
            skipped,
            write_procedure,
            read_procedure,
        })
    }
}

impl<T> TypeDescriptor<T> {
    /// Rust name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Codable objects are reference types: they carry a presence marker when nested.
    pub fn is_value_type(&self) -> bool {
        false
    }

    /// Included members, in wire order.
    pub fn members(&self) -> &[MemberDescriptor<T>] {
        &self.members
    }

    /// Names of the declared members the selection policy left out.
    pub fn skipped(&self) -> &[&'static str] {
        &self.skipped
    }

    /// Writes every included member of `value`.
    pub fn write(&self, value: &T, sink: &mut dyn Write, strategy: Strategy) -> Result<()> {
        match strategy {
            Strategy::Generic => {
                for member in &self.members {
                    member.write(value, &mut *sink, strategy)?;
                }
                Ok(())
            }
            Strategy::Specialized => (self.write_procedure)(value, sink, strategy),
        }
    }

    /// Reads every included member into `target`. Members that are not encoded keep
    /// their current values.
    pub fn read(&self, target: &mut T, source: &mut dyn Read, strategy: Strategy) -> Result<()> {
        match strategy {
            Strategy::Generic => {
                for member in &self.members {
                    member.read(target, &mut *source, strategy)?;
                }
                Ok(())
            }
            Strategy::Specialized => (self.read_procedure)(target, source, strategy),
        }
    }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("members", &self.members)
            .field("skipped", &self.skipped)
            .finish()
    }
}
