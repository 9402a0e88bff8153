// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registration tables that stand in for runtime reflection.
//!
//! A [`TypeShape`] lists what the registry may call on a type: its public
//! constructors, an optional default construction path, and the fields and methods
//! that can receive injected values. Shapes are built with [`ShapeBuilder`], which
//! turns typed closures into type-erased entries.

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::describe::{Describe, TypeInfo};
use crate::error::{AccessFailure, Error, InvocationError, Result};
use crate::instance::Instance;

type Erased = Box<dyn Any + Send + Sync>;
type ConstructFn = dyn Fn(&mut Arguments) -> std::result::Result<Erased, InvocationError> + Send + Sync;
type DefaultFn = dyn Fn() -> Erased + Send + Sync;
type AssignFn = dyn Fn(&mut dyn Any, Option<Instance>) -> Result<()> + Send + Sync;
type InvokeFn = dyn Fn(&mut dyn Any, &mut Arguments) -> Result<Instance> + Send + Sync;

/// How widely a member is visible.
///
/// The registry can reach members of any visibility. Only [`Visibility::Public`]
/// members are inherited through [`ShapeBuilder::extends`] and found by
/// [`Registry::invoke_named`](crate::Registry::invoke_named).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible to the type and its extensions.
    Protected,
    /// Visible inside the declaring namespace.
    Package,
    /// Visible only to the type itself.
    Private,
}

/// Whether a member asks to receive injected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The member is injected by the bulk passes.
    Inject,
    /// The member is left alone by the bulk passes.
    None,
}

/// The introspectable shape of a type.
#[derive(Clone)]
pub struct TypeShape {
    owner: &'static str,
    constructors: Vec<Constructor>,
    default: Option<Arc<DefaultFn>>,
    fields: Vec<Field>,
    methods: Vec<Method>,
}

impl TypeShape {
    /// Starts describing `T`.
    #[must_use]
    pub fn builder<T: Any + Send + Sync>() -> ShapeBuilder<T> {
        ShapeBuilder {
            shape: Self {
                owner: type_name::<T>(),
                constructors: Vec::new(),
                default: None,
                fields: Vec::new(),
                methods: Vec::new(),
            },
            _type: PhantomData,
        }
    }

    /// The public constructors, in registration order.
    ///
    /// Constructor selection tries them in this order; beyond that the order carries
    /// no meaning.
    #[must_use]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Whether the type can be built without a constructor.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Declared fields of every visibility, followed by inherited public ones.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Declared methods of every visibility, followed by inherited public ones.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub(crate) fn build_default(&self) -> Option<Erased> {
        self.default.as_ref().map(|default| default())
    }
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeShape")
            .field("owner", &self.owner)
            .field("constructors", &self.constructors)
            .field("has_default", &self.has_default())
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .finish()
    }
}

/// One public constructor: an ordered list of parameter types.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<TypeInfo>,
    invoke: Arc<ConstructFn>,
}

impl Constructor {
    /// The declared parameter types, in order.
    #[must_use]
    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub(crate) fn call(&self, args: &mut Arguments) -> std::result::Result<Erased, InvocationError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("params", &self.params).finish_non_exhaustive()
    }
}

/// A field that can be assigned a resolved value.
#[derive(Clone)]
pub struct Field {
    owner: &'static str,
    name: &'static str,
    ty: TypeInfo,
    visibility: Visibility,
    marker: Marker,
    assign: Option<Arc<AssignFn>>,
}

impl Field {
    /// The field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The declared type of the field.
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.ty
    }

    /// The declared visibility.
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the field carries [`Marker::Inject`].
    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marker == Marker::Inject
    }

    /// Stores `value` into the field of `target`.
    pub(crate) fn assign(&self, target: &mut dyn Any, value: Option<Instance>) -> Result<()> {
        match &self.assign {
            Some(assign) => assign(target, value),
            None => Err(Error::access(self.owner, self.name, AccessFailure::Sealed)),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.ty.name())
            .field("visibility", &self.visibility)
            .field("marker", &self.marker)
            .field("sealed", &self.assign.is_none())
            .finish()
    }
}

/// A method that can be called with resolved arguments.
#[derive(Clone)]
pub struct Method {
    owner: &'static str,
    name: &'static str,
    params: Vec<TypeInfo>,
    visibility: Visibility,
    marker: Marker,
    invoke: Option<Arc<InvokeFn>>,
}

impl Method {
    /// The method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The declared parameter types, in order.
    #[must_use]
    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    /// The declared visibility.
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the method carries [`Marker::Inject`].
    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marker == Marker::Inject
    }

    pub(crate) fn call(&self, target: &mut dyn Any, args: &mut Arguments) -> Result<Instance> {
        match &self.invoke {
            Some(invoke) => invoke(target, args),
            None => Err(Error::access(self.owner, self.name, AccessFailure::Sealed)),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .field("marker", &self.marker)
            .field("sealed", &self.invoke.is_none())
            .finish()
    }
}

/// Resolved arguments handed to a constructor or method, in declared order.
///
/// A slot is empty when the registry could not produce a value for it.
#[derive(Debug)]
pub struct Arguments {
    values: std::vec::IntoIter<Option<Instance>>,
    position: usize,
}

impl Arguments {
    /// Wraps already-resolved argument values.
    #[must_use]
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Takes the next argument, failing when it is empty or of another type.
    pub fn take<D: Any + Send + Sync>(&mut self) -> std::result::Result<Arc<D>, InvocationError> {
        let position = self.position;
        let value = self.next_slot()?.ok_or_else(|| InvocationError::missing_argument(position, type_name::<D>()))?;
        value
            .downcast::<D>()
            .ok_or_else(|| InvocationError::mismatched_argument(position, type_name::<D>()))
    }

    /// Takes the next argument, yielding `None` when it is empty or of another type.
    pub fn take_optional<D: Any + Send + Sync>(&mut self) -> Option<Arc<D>> {
        self.next_slot().ok().flatten().and_then(|value| value.downcast::<D>())
    }

    /// The number of arguments not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next_slot(&mut self) -> std::result::Result<Option<Instance>, InvocationError> {
        let slot = self.values.next().ok_or_else(|| InvocationError::exhausted(self.position))?;
        self.position += 1;
        Ok(slot)
    }
}

/// Builds a [`TypeShape`] for `T` from typed closures.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use wireup::{Describe, Marker, TypeInfo, TypeShape, Visibility};
///
/// #[derive(Default)]
/// struct Fuel;
///
/// impl Describe for Fuel {
///     fn type_info() -> TypeInfo {
///         TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
///     }
/// }
///
/// struct Engine {
///     fuel: Arc<Fuel>,
///     spare: Option<Arc<Fuel>>,
/// }
///
/// impl Describe for Engine {
///     fn type_info() -> TypeInfo {
///         TypeInfo::object::<Self>(module_path!(), || {
///             TypeShape::builder::<Self>()
///                 .constructor([TypeInfo::of::<Fuel>()], |args| {
///                     Ok(Engine { fuel: args.take()?, spare: None })
///                 })
///                 .field("spare", Visibility::Private, Marker::Inject, |engine: &mut Engine, spare| engine.spare = spare)
///                 .build()
///         })
///     }
/// }
///
/// let shape = TypeInfo::of::<Engine>().shape().unwrap();
/// assert_eq!(shape.constructors().len(), 1);
/// assert_eq!(shape.fields()[0].name(), "spare");
/// ```
pub struct ShapeBuilder<T> {
    shape: TypeShape,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ShapeBuilder<T> {
    /// Adds a public constructor taking `params`.
    #[must_use]
    pub fn constructor<I, F>(mut self, params: I, construct: F) -> Self
    where
        I: IntoIterator<Item = TypeInfo>,
        F: Fn(&mut Arguments) -> std::result::Result<T, InvocationError> + Send + Sync + 'static,
    {
        self.shape.constructors.push(Constructor {
            params: params.into_iter().collect(),
            invoke: Arc::new(move |args: &mut Arguments| construct(args).map(|value| Box::new(value) as Erased)),
        });
        self
    }

    /// Sets the path used to build `T` when it has no public constructors.
    #[must_use]
    pub fn default_with<F>(mut self, build: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.shape.default = Some(Arc::new(move || Box::new(build()) as Erased));
        self
    }

    /// Uses [`Default`] as the path used to build `T` when it has no public constructors.
    #[must_use]
    pub fn default_constructible(self) -> Self
    where
        T: Default,
    {
        self.default_with(T::default)
    }

    /// Adds a field of type `D` that is assigned through `assign`.
    #[must_use]
    pub fn field<D, F>(mut self, name: &'static str, visibility: Visibility, marker: Marker, assign: F) -> Self
    where
        D: Describe,
        F: Fn(&mut T, Option<Arc<D>>) + Send + Sync + 'static,
    {
        let owner = self.shape.owner;
        let erased: Arc<AssignFn> = Arc::new(move |target: &mut dyn Any, value: Option<Instance>| {
            let this = target
                .downcast_mut::<T>()
                .ok_or_else(|| Error::access(owner, name, AccessFailure::Receiver))?;
            let value = match value {
                Some(value) => Some(value.downcast::<D>().ok_or_else(|| Error::access(owner, name, AccessFailure::ValueType))?),
                None => None,
            };
            assign(this, value);
            Ok(())
        });

        self.shape.fields.push(Field {
            owner,
            name,
            ty: D::type_info(),
            visibility,
            marker,
            assign: Some(erased),
        });
        self
    }

    /// Adds a field of type `D` that refuses every assignment.
    #[must_use]
    pub fn sealed_field<D: Describe>(mut self, name: &'static str, visibility: Visibility, marker: Marker) -> Self {
        self.shape.fields.push(Field {
            owner: self.shape.owner,
            name,
            ty: D::type_info(),
            visibility,
            marker,
            assign: None,
        });
        self
    }

    /// Adds a method taking `params` and returning an `R`.
    #[must_use]
    pub fn method<R, I, F>(mut self, name: &'static str, visibility: Visibility, marker: Marker, params: I, invoke: F) -> Self
    where
        R: Describe,
        I: IntoIterator<Item = TypeInfo>,
        F: Fn(&mut T, &mut Arguments) -> std::result::Result<R, InvocationError> + Send + Sync + 'static,
    {
        let owner = self.shape.owner;
        let erased: Arc<InvokeFn> = Arc::new(move |target: &mut dyn Any, args: &mut Arguments| {
            let this = target
                .downcast_mut::<T>()
                .ok_or_else(|| Error::access(owner, name, AccessFailure::Receiver))?;
            invoke(this, args)
                .map(Instance::new)
                .map_err(|source| Error::invocation(owner, name, source))
        });

        self.shape.methods.push(Method {
            owner,
            name,
            params: params.into_iter().collect(),
            visibility,
            marker,
            invoke: Some(erased),
        });
        self
    }

    /// Adds a one-parameter method of type `D` with no result.
    ///
    /// Name it `set_*` for [`Registry::inject_into_setters`](crate::Registry::inject_into_setters)
    /// to consider it.
    #[must_use]
    pub fn setter<D, F>(self, name: &'static str, visibility: Visibility, marker: Marker, set: F) -> Self
    where
        D: Describe,
        F: Fn(&mut T, Option<Arc<D>>) + Send + Sync + 'static,
    {
        self.method(name, visibility, marker, [D::type_info()], move |this, args| {
            set(this, args.take_optional::<D>());
            Ok(())
        })
    }

    /// Adds a method taking `params` that refuses every call.
    #[must_use]
    pub fn sealed_method<I>(mut self, name: &'static str, visibility: Visibility, marker: Marker, params: I) -> Self
    where
        I: IntoIterator<Item = TypeInfo>,
    {
        self.shape.methods.push(Method {
            owner: self.shape.owner,
            name,
            params: params.into_iter().collect(),
            visibility,
            marker,
            invoke: None,
        });
        self
    }

    /// Inherits the public fields and methods of `P`, reached through `project`.
    ///
    /// Constructors are not inherited.
    #[must_use]
    pub fn extends<P: Describe>(mut self, project: fn(&mut T) -> &mut P) -> Self {
        let Some(parent) = P::type_info().shape() else {
            return self;
        };
        let owner = self.shape.owner;

        for field in parent.fields.into_iter().filter(|field| field.visibility == Visibility::Public) {
            let name = field.name;
            let assign = field.assign.map(|inner| {
                Arc::new(move |target: &mut dyn Any, value: Option<Instance>| {
                    let this = target
                        .downcast_mut::<T>()
                        .ok_or_else(|| Error::access(owner, name, AccessFailure::Receiver))?;
                    inner(project(this) as &mut dyn Any, value)
                }) as Arc<AssignFn>
            });
            self.shape.fields.push(Field { assign, ..field });
        }

        for method in parent.methods.into_iter().filter(|method| method.visibility == Visibility::Public) {
            let name = method.name;
            let invoke = method.invoke.map(|inner| {
                Arc::new(move |target: &mut dyn Any, args: &mut Arguments| {
                    let this = target
                        .downcast_mut::<T>()
                        .ok_or_else(|| Error::access(owner, name, AccessFailure::Receiver))?;
                    inner(project(this) as &mut dyn Any, args)
                }) as Arc<InvokeFn>
            });
            self.shape.methods.push(Method { invoke, ..method });
        }

        self
    }

    /// Finishes the shape.
    #[must_use]
    pub fn build(self) -> TypeShape {
        self.shape
    }
}

impl<T> fmt::Debug for ShapeBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeBuilder").field("shape", &self.shape).finish()
    }
}
