// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime type identity for resolvable types.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::shape::TypeShape;

/// A type the registry can reason about.
///
/// Implementations return a [`TypeInfo`] naming the module the type lives in and a
/// function describing its constructors, fields and methods.
///
/// # Examples
///
/// ```
/// use wireup::{Describe, TypeInfo, TypeShape};
///
/// #[derive(Default)]
/// struct Clock;
///
/// impl Describe for Clock {
///     fn type_info() -> TypeInfo {
///         TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
///     }
/// }
///
/// assert_eq!(TypeInfo::of::<Clock>().name(), std::any::type_name::<Clock>());
/// ```
pub trait Describe: Any + Send + Sync {
    /// Returns the identity of this type.
    fn type_info() -> TypeInfo;
}

/// The eight scalar categories that are never eligible for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `bool`.
    Boolean,
    /// `i8` and `u8`.
    Byte,
    /// `i16` and `u16`.
    Short,
    /// `i32` and `u32`.
    Int,
    /// `i64`, `u64`, `isize` and `usize`.
    Long,
    /// `f32`.
    Float,
    /// `f64`.
    Double,
    /// `char`.
    Char,
}

/// How a type is classified for eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A scalar.
    Primitive(Primitive),
    /// A single-dimension array of scalars: `Vec<P>` or `[P; N]`.
    PrimitiveArray(Primitive),
    /// Anything else.
    Object,
}

impl TypeKind {
    /// Whether this is a scalar or a single-dimension array of scalars.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(self, Self::Primitive(_) | Self::PrimitiveArray(_))
    }
}

/// The identity of a type: its [`TypeId`], name, namespace and shape.
///
/// Two `TypeInfo` values are equal when they describe the same [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    namespace: Option<&'static str>,
    kind: TypeKind,
    shape: Option<fn() -> TypeShape>,
}

impl TypeInfo {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: Describe>() -> Self {
        T::type_info()
    }

    /// Describes a type declared in `namespace` with the given shape.
    ///
    /// `namespace` is usually `module_path!()` at the declaration site.
    #[must_use]
    pub fn object<T: Any>(namespace: &'static str, shape: fn() -> TypeShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            namespace: Some(namespace),
            kind: TypeKind::Object,
            shape: Some(shape),
        }
    }

    /// Describes a type that has a shape but no namespace.
    ///
    /// Such a type is never eligible for implicit resolution, but it can still be
    /// constructed when requested directly or once it is mapped.
    #[must_use]
    pub fn unnamed<T: Any>(shape: fn() -> TypeShape) -> Self {
        Self {
            shape: Some(shape),
            ..Self::opaque::<T>()
        }
    }

    /// Describes a type the registry knows nothing about.
    ///
    /// Opaque types are only ever produced from an explicit mapping.
    #[must_use]
    pub fn opaque<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            namespace: None,
            kind: TypeKind::Object,
            shape: None,
        }
    }

    fn primitive<T: Any>(kind: TypeKind) -> Self {
        Self {
            kind,
            ..Self::opaque::<T>()
        }
    }

    /// The [`TypeId`] of the described type.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The name of the described type, as reported by [`std::any::type_name`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The namespace the type was declared in, if it has one.
    #[must_use]
    pub const fn namespace(&self) -> Option<&'static str> {
        self.namespace
    }

    /// How the type is classified.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Builds the shape of the type, if one was registered.
    ///
    /// Every call runs the registered shape function anew. A [`Registry`](crate::Registry)
    /// builds each shape once and shares it with its copies.
    #[must_use]
    pub fn shape(&self) -> Option<TypeShape> {
        self.shape.map(|shape| shape())
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("has_shape", &self.shape.is_some())
            .finish()
    }
}

/// A scalar type that maps onto one of the [`Primitive`] categories.
pub trait Scalar: Describe + Copy + private::Sealed {
    /// The category of this scalar.
    const PRIMITIVE: Primitive;
}

mod private {
    pub trait Sealed {}
}

macro_rules! scalar {
    ($($ty:ty => $primitive:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}

            impl Scalar for $ty {
                const PRIMITIVE: Primitive = Primitive::$primitive;
            }

            impl Describe for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::primitive::<Self>(TypeKind::Primitive(Primitive::$primitive))
                }
            }
        )*
    };
}

scalar! {
    bool => Boolean,
    i8 => Byte,
    u8 => Byte,
    i16 => Short,
    u16 => Short,
    i32 => Int,
    u32 => Int,
    i64 => Long,
    u64 => Long,
    isize => Long,
    usize => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
}

impl<P: Scalar> Describe for Vec<P> {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive::<Self>(TypeKind::PrimitiveArray(P::PRIMITIVE))
    }
}

impl<P: Scalar, const N: usize> Describe for [P; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive::<Self>(TypeKind::PrimitiveArray(P::PRIMITIVE))
    }
}

/// Boxed scalars are ordinary objects: their only constructor takes the bare scalar,
/// so they become resolvable once mapped.
impl<P: Scalar> Describe for Box<P> {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>("alloc::boxed", boxed_shape::<P>)
    }
}

fn boxed_shape<P: Scalar>() -> TypeShape {
    TypeShape::builder::<Box<P>>()
        .constructor([TypeInfo::of::<P>()], |args| Ok(Box::new(*args.take::<P>()?)))
        .build()
}

impl Describe for String {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>("alloc::string", || TypeShape::builder::<Self>().default_constructible().build())
    }
}

impl Describe for () {
    fn type_info() -> TypeInfo {
        TypeInfo::opaque::<Self>()
    }
}
