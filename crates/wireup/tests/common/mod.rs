// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code, reason = "each test crate uses a different subset of the fixtures")]

//! Fixture types shared by the integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use wireup::{Describe, InvocationError, Marker, TypeInfo, TypeShape, Visibility};

/// The namespace every fixture below is declared in.
pub const NAMESPACE: &str = module_path!();

fn object<T: Describe>(shape: fn() -> TypeShape) -> TypeInfo {
    TypeInfo::object::<T>(NAMESPACE, shape)
}

/// Counts constructions. Opaque, so it must be mapped to be injected.
#[derive(Debug, Default)]
pub struct Tally(AtomicUsize);

impl Tally {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Describe for Tally {
    fn type_info() -> TypeInfo {
        TypeInfo::opaque::<Self>()
    }
}

/// Bumps the mapped [`Tally`] whenever it is constructed.
#[derive(Debug)]
pub struct Counted {
    pub tally: Arc<Tally>,
    pub serial: usize,
}

impl Describe for Counted {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Tally>()], |args| {
                    let tally: Arc<Tally> = args.take()?;
                    let serial = tally.bump();
                    Ok(Self { tally, serial })
                })
                .build()
        })
    }
}

/// No public constructors, default-constructible.
#[derive(Debug, Default)]
pub struct Leaf;

impl Describe for Leaf {
    fn type_info() -> TypeInfo {
        object::<Self>(|| TypeShape::builder::<Self>().default_constructible().build())
    }
}

/// Stands in for [`Leaf`] under a different key.
#[derive(Debug, Default)]
pub struct OtherLeaf;

impl Describe for OtherLeaf {
    fn type_info() -> TypeInfo {
        object::<Self>(|| TypeShape::builder::<Self>().default_constructible().build())
    }
}

/// No public constructors and no default path either.
#[derive(Debug)]
pub struct Abstract;

impl Describe for Abstract {
    fn type_info() -> TypeInfo {
        object::<Self>(|| TypeShape::builder::<Self>().build())
    }
}

/// A type the registry knows nothing about.
#[derive(Debug)]
pub struct Handle;

impl Describe for Handle {
    fn type_info() -> TypeInfo {
        TypeInfo::opaque::<Self>()
    }
}

/// Only constructor takes a scalar.
#[derive(Debug)]
pub struct NeedsPrimitive(pub i32);

impl Describe for NeedsPrimitive {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<i32>()], |args| Ok(Self(*args.take::<i32>()?)))
                .build()
        })
    }
}

/// Only constructor takes a boxed scalar.
#[derive(Debug)]
pub struct NeedsBoxed(pub i32);

impl Describe for NeedsBoxed {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Box<i32>>()], |args| Ok(Self(**args.take::<Box<i32>>()?)))
                .build()
        })
    }
}

/// Only constructor takes an opaque [`Handle`].
#[derive(Debug)]
pub struct NeedsHandle;

impl Describe for NeedsHandle {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Handle>()], |_| Ok(Self))
                .build()
        })
    }
}

/// Takes two [`Counted`] values.
#[derive(Debug)]
pub struct Pair {
    pub first: Arc<Counted>,
    pub second: Arc<Counted>,
}

impl Describe for Pair {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Counted>(), TypeInfo::of::<Counted>()], |args| {
                    Ok(Self {
                        first: args.take()?,
                        second: args.take()?,
                    })
                })
                .build()
        })
    }
}

/// Has an ineligible constructor before an eligible one.
#[derive(Debug)]
pub struct Choosy {
    pub picked: &'static str,
}

impl Describe for Choosy {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Handle>()], |_| Ok(Self { picked: "handle" }))
                .constructor([TypeInfo::of::<Leaf>()], |_| Ok(Self { picked: "leaf" }))
                .constructor([], |_| Ok(Self { picked: "empty" }))
                .build()
        })
    }
}

/// Prefers a constructor taking a [`Backref`], which needs a `Fallback` itself.
#[derive(Debug)]
pub struct Fallback {
    pub picked: &'static str,
}

impl Describe for Fallback {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Backref>()], |_| Ok(Self { picked: "backref" }))
                .constructor([], |_| Ok(Self { picked: "empty" }))
                .build()
        })
    }
}

/// Only constructor takes a [`Fallback`].
#[derive(Debug)]
pub struct Backref(pub Arc<Fallback>);

impl Describe for Backref {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Fallback>()], |args| Ok(Self(args.take()?)))
                .build()
        })
    }
}

/// The constructor always fails.
#[derive(Debug)]
pub struct Failing;

impl Describe for Failing {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([], |_| Err(InvocationError::new("refusing to start")))
                .build()
        })
    }
}

/// Declared outside [`NAMESPACE`].
#[derive(Debug, Default)]
pub struct Stranger;

impl Describe for Stranger {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>("vendor::widgets", || TypeShape::builder::<Self>().default_constructible().build())
    }
}

/// Only constructor takes a [`Stranger`].
#[derive(Debug)]
pub struct NeedsStranger;

impl Describe for NeedsStranger {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Stranger>()], |_| Ok(Self))
                .build()
        })
    }
}

/// Has a shape but no namespace.
#[derive(Debug, Default)]
pub struct Anonymous;

impl Describe for Anonymous {
    fn type_info() -> TypeInfo {
        TypeInfo::unnamed::<Self>(|| TypeShape::builder::<Self>().default_constructible().build())
    }
}

/// Depends on itself.
#[derive(Debug)]
pub struct Ouroboros(pub Option<Arc<Ouroboros>>);

impl Describe for Ouroboros {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Self>()], |args| Ok(Self(args.take_optional())))
                .build()
        })
    }
}

/// Depends on [`Pong`], which depends back on it.
#[derive(Debug)]
pub struct Ping(pub Arc<Pong>);

impl Describe for Ping {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Pong>()], |args| Ok(Self(args.take()?)))
                .build()
        })
    }
}

/// Depends on [`Ping`].
#[derive(Debug)]
pub struct Pong(pub Arc<Ping>);

impl Describe for Pong {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Ping>()], |args| Ok(Self(args.take()?)))
                .build()
        })
    }
}

/// One injectable member per visibility.
///
/// Every field is marked except the private one. Every setter is marked, but the
/// private setter is sealed and refuses the call.
#[derive(Debug, Default)]
pub struct Injections {
    pub public: Option<Arc<Leaf>>,
    pub protected: Option<Arc<Leaf>>,
    pub package: Option<Arc<Leaf>>,
    pub private: Option<Arc<Leaf>>,
}

impl Injections {
    pub fn is_empty(&self) -> bool {
        self.public.is_none() && self.protected.is_none() && self.package.is_none() && self.private.is_none()
    }
}

impl Describe for Injections {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .default_constructible()
                .field("public", Visibility::Public, Marker::Inject, |this: &mut Self, leaf| this.public = leaf)
                .field("protected", Visibility::Protected, Marker::Inject, |this: &mut Self, leaf| this.protected = leaf)
                .field("package", Visibility::Package, Marker::Inject, |this: &mut Self, leaf| this.package = leaf)
                .field("private", Visibility::Private, Marker::None, |this: &mut Self, leaf| this.private = leaf)
                .setter("set_public", Visibility::Public, Marker::Inject, |this: &mut Self, leaf| this.public = leaf)
                .setter("set_protected", Visibility::Protected, Marker::Inject, |this: &mut Self, leaf| {
                    this.protected = leaf;
                })
                .setter("set_package", Visibility::Package, Marker::Inject, |this: &mut Self, leaf| this.package = leaf)
                .sealed_method("set_private", Visibility::Private, Marker::Inject, [TypeInfo::of::<Leaf>()])
                .method("is_empty", Visibility::Public, Marker::None, [], |this: &mut Self, _| Ok(this.is_empty()))
                .method("matches", Visibility::Public, Marker::Inject, [TypeInfo::of::<Handle>()], |_: &mut Self, _| {
                    Ok(false)
                })
                .build()
        })
    }
}

/// Inherits the public members of [`Injections`].
#[derive(Debug, Default)]
pub struct Child {
    pub base: Injections,
}

impl Describe for Child {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .default_constructible()
                .extends(|child: &mut Self| &mut child.base)
                .build()
        })
    }
}

/// Has methods whose bodies succeed or fail.
#[derive(Debug, Default)]
pub struct Service {
    pub started_with: Option<usize>,
}

impl Describe for Service {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .default_constructible()
                .method("start", Visibility::Public, Marker::None, [TypeInfo::of::<Counted>()], |this: &mut Self, args| {
                    let counted: Arc<Counted> = args.take()?;
                    this.started_with = Some(counted.serial);
                    Ok(counted.serial)
                })
                .method("crash", Visibility::Public, Marker::None, [], |_: &mut Self, _| {
                    Err::<(), _>(InvocationError::new("crashed on purpose"))
                })
                .sealed_method("locked", Visibility::Public, Marker::None, [])
                .build()
        })
    }
}

/// A sealed marked field declared before an assignable one.
#[derive(Debug, Default)]
pub struct Guarded {
    pub locked: Option<Arc<Leaf>>,
    pub leaf: Option<Arc<Leaf>>,
}

impl Describe for Guarded {
    fn type_info() -> TypeInfo {
        object::<Self>(|| {
            TypeShape::builder::<Self>()
                .default_constructible()
                .sealed_field::<Leaf>("locked", Visibility::Private, Marker::Inject)
                .field("leaf", Visibility::Public, Marker::Inject, |this: &mut Self, leaf| this.leaf = leaf)
                .build()
        })
    }
}
