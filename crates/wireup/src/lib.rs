// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Runtime dependency resolution with singleton caching and member injection.
//!
//! A [`Registry`] decides whether an instance of a requested type can be produced,
//! builds it through the first usable constructor, resolves that constructor's
//! parameters recursively, and then fills marked fields and setters of the new
//! instance. Types are either bound explicitly, as a [`Lifecycle::Singleton`] or a
//! [`Lifecycle::Transient`], or resolved implicitly when they live in one of the
//! registry's namespaces.
//!
//! # Describing types
//!
//! Rust has no runtime reflection, so every resolvable type implements [`Describe`]
//! and registers its [`TypeShape`]: the public constructors, a default construction
//! path, and the fields and methods that may receive injected values.
//!
//! ```
//! use std::sync::Arc;
//!
//! use wireup::{Describe, Lifecycle, Marker, Registry, TypeInfo, TypeShape, Visibility};
//!
//! #[derive(Default)]
//! struct Database;
//!
//! impl Describe for Database {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Audit;
//!
//! impl Describe for Audit {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
//!     }
//! }
//!
//! struct Users {
//!     database: Arc<Database>,
//!     audit: Option<Arc<Audit>>,
//! }
//!
//! impl Describe for Users {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::object::<Self>(module_path!(), || {
//!             TypeShape::builder::<Self>()
//!                 .constructor([TypeInfo::of::<Database>()], |args| {
//!                     Ok(Users { database: args.take()?, audit: None })
//!                 })
//!                 .field("audit", Visibility::Private, Marker::Inject, |users: &mut Users, audit| users.audit = audit)
//!                 .build()
//!         })
//!     }
//! }
//!
//! let registry = Registry::new(module_path!());
//! registry.add_mapping::<Database>(Lifecycle::Singleton);
//!
//! let users = registry.get::<Users>().unwrap();
//! assert!(users.audit.is_some());
//! assert!(Arc::ptr_eq(&users.database, &registry.get::<Database>().unwrap()));
//! ```
//!
//! # Eligibility
//!
//! A type is eligible when it is mapped, or when it is not a scalar (or an array of
//! scalars), it has a namespace starting with one of the registry's prefixes, and one
//! of its constructors takes only eligible parameters. A type with no public
//! constructors counts as constructible.
//!
//! # Errors
//!
//! Implicit paths never fail: [`Registry::get`], [`Registry::resolve`] and the bulk
//! injection passes log problems through [`tracing`] and return `None` or leave the
//! member untouched. Explicit calls such as [`Registry::invoke`] return an
//! [`Error`][enum@Error].
//!
//! # Scoped parameters
//!
//! [`Registry::get_with`] resolves a type against a copy of the registry that has
//! extra singletons registered, leaving the original registry unchanged.
//!
//! # Cycles
//!
//! A type that depends on itself, directly or through other types, is reported as
//! ineligible, or fails construction, rather than recursing without bound.
//!
//! # Thread safety
//!
//! [`Registry`] is `Send` and `Sync` and all of its methods take `&self`. Singletons
//! are built without holding a lock; see [`Binding`] for what that means under
//! concurrent first use.

mod builder;
mod describe;
mod error;
mod instance;
mod registry;
mod shape;
mod trail;

pub use builder::RegistryBuilder;
pub use describe::{Describe, Primitive, Scalar, TypeInfo, TypeKind};
pub use error::{AccessFailure, ConstructionFailure, Error, ErrorKind, InvocationError, Result};
pub use instance::Instance;
pub use registry::{Binding, Lifecycle, Registry};
pub use shape::{Arguments, Constructor, Field, Marker, Method, ShapeBuilder, TypeShape, Visibility};
