//! # Type Classification
//!
//! Every type that can cross an archive falls into exactly one
//! [`SerializationKind`], decided at compile time:
//!
//! 1. numeric scalars, `bool` and `char` are **primitive**
//! 2. enums declared with [`primitive_enum!`](crate::primitive_enum) are **primitive**
//! 3. fixed-size arrays of primitives are **primitive**
//! 4. types implementing [`Serializable`] are **composite**
//! 5. anything else is **invalid**
//!
//! Classification is carried by the [`Archived`] trait. A type that is neither
//! primitive nor serializable does not implement it, so handing one to
//! [`Archive::field`] is rejected by the compiler:
//!
//! ```compile_fail
//! use peerlink::core::archive::Archive;
//! use peerlink::core::buffer::BufferWriter;
//!
//! struct Opaque;
//!
//! let mut writer = BufferWriter::new();
//! writer.field(&mut Opaque).unwrap();
//! ```
//!
//! Code that only learns the type at macro-expansion time can use
//! [`kind_of!`](crate::kind_of) and [`try_field!`](crate::try_field), which
//! report [`SerializationKind::Invalid`] or fail with
//! [`ProtocolError::Classification`](crate::error::ProtocolError::Classification)
//! instead of refusing to build.

use crate::core::archive::Archive;
use crate::error::{ProtocolError, Result};
use std::fmt;
use std::marker::PhantomData;

/// Serialization strategy of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationKind {
    /// Neither primitive nor serializable; cannot be archived
    Invalid,
    /// Fixed-size value copied as raw bytes
    Primitive,
    /// Value that serializes itself through the archive
    Composite,
}

impl SerializationKind {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            SerializationKind::Invalid => "invalid",
            SerializationKind::Primitive => "primitive",
            SerializationKind::Composite => "composite",
        }
    }
}

impl fmt::Display for SerializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The composite capability: a type that reads and writes its own fields.
///
/// One `serialize` body drives both directions. Fields must be visited in the
/// same order every time; the archive decides whether each visit saves or
/// loads. `version` is the protocol version of the archive, passed through
/// unchanged so implementations can skip or add fields for older peers.
///
/// ```rust
/// use peerlink::core::archive::Archive;
/// use peerlink::core::kind::Serializable;
/// use peerlink::error::Result;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Hero {
///     name: String,
///     level: u8,
///     skills: Vec<u16>,
///     mana: u32,
/// }
///
/// impl Serializable for Hero {
///     fn serialize<A: Archive>(&mut self, ar: &mut A, version: u32) -> Result<()> {
///         ar.field(&mut self.name)?.field(&mut self.level)?.field(&mut self.skills)?;
///         if version >= 60 {
///             ar.field(&mut self.mana)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Serializable {
    /// Visit every field through `ar`, in a fixed order
    fn serialize<A: Archive>(&mut self, ar: &mut A, version: u32) -> Result<()>;
}

/// A classified type: one that an archive knows how to transfer.
///
/// Implemented for all primitives and, through a blanket impl, for every
/// [`Serializable`] type. `archive` is the compile-time dispatch: primitives
/// go to [`Archive::primitive`], composites to their own `serialize`.
pub trait Archived {
    /// Classification of the type
    const KIND: SerializationKind;

    /// Save or load `self` through `ar`, depending on the archive direction
    fn archive<A: Archive>(&mut self, ar: &mut A) -> Result<()>;
}

macro_rules! impl_primitive_archived {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Archived for $ty {
                const KIND: SerializationKind = SerializationKind::Primitive;

                #[inline]
                fn archive<A: Archive>(&mut self, ar: &mut A) -> Result<()> {
                    ar.primitive(self)
                }
            }
        )*
    };
}

impl_primitive_archived!(
    u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, f32, f64, bool, char
);

impl<T: crate::core::primitive::Primitive, const N: usize> Archived for [T; N] {
    const KIND: SerializationKind = SerializationKind::Primitive;

    #[inline]
    fn archive<A: Archive>(&mut self, ar: &mut A) -> Result<()> {
        ar.primitive(self)
    }
}

impl<T: Serializable> Archived for T {
    const KIND: SerializationKind = SerializationKind::Composite;

    #[inline]
    fn archive<A: Archive>(&mut self, ar: &mut A) -> Result<()> {
        let version = ar.version();
        self.serialize(ar, version)
    }
}

/// Classification of a type known to be archivable
pub const fn kind_of_archived<T: Archived>() -> SerializationKind {
    T::KIND
}

/// Zero-sized probe used by [`kind_of!`](crate::kind_of)
pub struct KindProbe<T: ?Sized>(PhantomData<T>);

impl<T: ?Sized> KindProbe<T> {
    /// Probe for `T`; only meaningful through `kind_of!`
    pub const fn new() -> Self {
        KindProbe(PhantomData)
    }
}

impl<T: ?Sized> Default for KindProbe<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[doc(hidden)]
pub trait ClassifiedKind {
    fn probe_kind(&self) -> SerializationKind;
}

impl<T: Archived> ClassifiedKind for KindProbe<T> {
    fn probe_kind(&self) -> SerializationKind {
        T::KIND
    }
}

#[doc(hidden)]
pub trait UnclassifiedKind {
    fn probe_kind(&self) -> SerializationKind;
}

impl<T: ?Sized> UnclassifiedKind for &KindProbe<T> {
    fn probe_kind(&self) -> SerializationKind {
        SerializationKind::Invalid
    }
}

/// Probe wrapping a field for [`try_field!`](crate::try_field)
pub struct FieldProbe<'a, T>(pub &'a mut T);

#[doc(hidden)]
pub trait ClassifiedField {
    fn probe_field<A: Archive>(&mut self, ar: &mut A) -> Result<()>;
}

impl<T: Archived> ClassifiedField for FieldProbe<'_, T> {
    fn probe_field<A: Archive>(&mut self, ar: &mut A) -> Result<()> {
        ar.field(&mut *self.0).map(|_| ())
    }
}

#[doc(hidden)]
pub trait UnclassifiedField {
    fn probe_field<A: Archive>(&mut self, ar: &mut A) -> Result<()>;
}

impl<T> UnclassifiedField for &mut FieldProbe<'_, T> {
    fn probe_field<A: Archive>(&mut self, _ar: &mut A) -> Result<()> {
        Err(ProtocolError::Classification {
            type_name: std::any::type_name::<T>(),
        })
    }
}

/// Classify a concrete type, yielding `Invalid` instead of a compile error.
///
/// Resolution happens at the expansion site, so the type must be concrete
/// there; an unconstrained generic parameter always reports `Invalid`.
///
/// ```rust
/// use peerlink::core::kind::SerializationKind;
/// use peerlink::kind_of;
///
/// assert_eq!(kind_of!(u64), SerializationKind::Primitive);
/// assert_eq!(kind_of!(Vec<String>), SerializationKind::Composite);
/// assert_eq!(kind_of!(std::cell::Cell<u8>), SerializationKind::Invalid);
/// ```
#[macro_export]
macro_rules! kind_of {
    ($ty:ty) => {{
        #[allow(unused_imports)]
        use $crate::core::kind::{ClassifiedKind as _, UnclassifiedKind as _};
        (&$crate::core::kind::KindProbe::<$ty>::new()).probe_kind()
    }};
}

/// Archive a field whose classification is checked when the call is made.
///
/// Classifiable values behave like `ar.field(value)`. Anything else fails
/// with `ProtocolError::Classification` before a single byte is transferred.
///
/// ```rust
/// use peerlink::core::buffer::BufferWriter;
/// use peerlink::error::ProtocolError;
/// use peerlink::try_field;
///
/// let mut writer = BufferWriter::new();
/// let mut raw = std::time::Instant::now();
/// let result = try_field!(&mut writer, &mut raw);
/// assert!(matches!(result, Err(ProtocolError::Classification { .. })));
/// assert!(writer.is_empty());
/// ```
#[macro_export]
macro_rules! try_field {
    ($ar:expr, $value:expr) => {{
        #[allow(unused_imports)]
        use $crate::core::kind::{ClassifiedField as _, UnclassifiedField as _};
        (&mut $crate::core::kind::FieldProbe($value)).probe_field($ar)
    }};
}
