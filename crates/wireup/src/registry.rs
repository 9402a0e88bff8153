// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Binding`] and [`Registry`], the two halves of resolution.
//!
//! They are co-recursive: a binding resolves its constructor parameters through the
//! registry, and the registry resolves every request through a binding.

use std::any::{Any, TypeId, type_name};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::{DashMap, DashSet};
use tracing::Level;

use crate::builder::RegistryBuilder;
use crate::describe::{Describe, TypeInfo};
use crate::error::{ConstructionFailure, Error, Result};
use crate::instance::Instance;
use crate::shape::{Arguments, Constructor, Method, TypeShape, Visibility};
use crate::trail::{self, Stage};

const SETTER_PREFIX: &str = "set_";

/// How often a binding produces a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// One instance, built on first use and reused afterwards.
    Singleton,
    /// A new instance for every resolution.
    Transient,
}

/// The rule for producing instances of one type.
///
/// # Concurrent first use
///
/// The singleton slot is not held while the instance is built. Two threads that
/// resolve the same unbuilt singleton at once may both construct it; the instance
/// written last stays cached and the other is handed only to the thread that built
/// it. Callers that need exactly one construction under concurrent first use must
/// serialize the first resolution themselves.
///
/// Duplicates made by [`duplicate`](Self::duplicate) share the slot, so whichever
/// of them builds the singleton first builds it for all of them.
pub struct Binding {
    target: TypeInfo,
    lifecycle: Lifecycle,
    cached: Arc<RwLock<Option<Instance>>>,
}

impl Binding {
    /// Creates a binding that builds `target` with the given lifecycle.
    #[must_use]
    pub fn new(target: TypeInfo, lifecycle: Lifecycle) -> Self {
        Self {
            target,
            lifecycle,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a binding that builds `T` with the given lifecycle.
    #[must_use]
    pub fn of<T: Describe>(lifecycle: Lifecycle) -> Self {
        Self::new(TypeInfo::of::<T>(), lifecycle)
    }

    /// Creates a singleton binding that always hands out `instance`.
    #[must_use]
    pub fn from_instance(instance: Instance) -> Self {
        Self {
            target: instance.type_info(),
            lifecycle: Lifecycle::Singleton,
            cached: Arc::new(RwLock::new(Some(instance))),
        }
    }

    /// The type this binding builds.
    #[must_use]
    pub const fn target(&self) -> TypeInfo {
        self.target
    }

    /// The lifecycle of this binding.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The cached singleton instance, if one has been built.
    #[must_use]
    pub fn cached(&self) -> Option<Instance> {
        if self.lifecycle != Lifecycle::Singleton {
            return None;
        }
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether `ty` can be built against `registry`.
    ///
    /// A type with no public constructors is assumed to have a default construction
    /// path. Otherwise at least one constructor must take only eligible parameters.
    #[must_use]
    pub fn is_constructible(ty: &TypeInfo, registry: &Registry) -> bool {
        let Some(shape) = registry.shape_of(ty) else {
            return true;
        };
        let constructors = shape.constructors();
        constructors.is_empty() || constructors.iter().any(|constructor| Self::is_constructor_eligible(constructor, registry))
    }

    /// Whether every parameter of `constructor` is eligible in `registry`.
    #[must_use]
    pub fn is_constructor_eligible(constructor: &Constructor, registry: &Registry) -> bool {
        constructor.params().iter().all(|param| registry.eligible(param))
    }

    /// Whether the target of this binding can be built against `registry`.
    #[must_use]
    pub fn is_instantiable(&self, registry: &Registry) -> bool {
        Self::is_constructible(&self.target, registry)
    }

    /// Returns an instance, building and caching it first for an unbuilt singleton.
    pub fn resolve(&self, registry: &Registry) -> Result<Instance> {
        if self.lifecycle == Lifecycle::Transient {
            return self.construct(registry);
        }

        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let built = self.construct(registry)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(built.clone());
        Ok(built)
    }

    /// Builds a new instance, ignoring any cached one.
    ///
    /// Constructors are tried in the order the type's shape lists them and the first
    /// one whose parameters are all eligible is called with freshly resolved arguments.
    /// The new instance then receives field and setter injection if the registry has
    /// them enabled.
    pub fn construct(&self, registry: &Registry) -> Result<Instance> {
        let target = self.target;
        let Some(_step) = trail::enter(target.id(), Stage::Construction) else {
            tracing::debug!(type.name = target.name(), "dependency cycle detected during construction");
            return Err(Error::construction(target.name(), ConstructionFailure::Cycle));
        };

        let shape = registry.shape_of(&target);
        let constructors = shape.as_ref().map_or(&[][..], |shape| shape.constructors());

        let mut value = if constructors.is_empty() {
            shape
                .as_ref()
                .and_then(|shape| shape.build_default())
                .ok_or_else(|| Error::construction(target.name(), ConstructionFailure::NotInstantiable))?
        } else {
            let (index, constructor) = constructors
                .iter()
                .enumerate()
                .find(|(_, constructor)| Self::is_constructor_eligible(constructor, registry))
                .ok_or_else(|| Error::construction(target.name(), ConstructionFailure::NoEligibleConstructor))?;

            let mut args = registry.resolve_all(constructor.params());
            constructor
                .call(&mut args)
                .map_err(|source| Error::invocation(target.name(), format!("constructor #{index}"), source))?
        };

        if registry.injects_properties() {
            registry.inject_fields_dyn(&target, &mut *value);
        }
        if registry.injects_setters() {
            registry.inject_setters_dyn(&target, &mut *value);
        }

        tracing::trace!(type.name = target.name(), lifecycle = ?self.lifecycle, "constructed instance");
        Ok(Instance::from_boxed(target, value))
    }

    /// Duplicates this binding for a scoped registry.
    ///
    /// The duplicate shares the singleton slot of this binding: an instance built
    /// through either of them is cached for both.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clone`] when the slot of a singleton cannot be read.
    pub fn duplicate(&self) -> Result<Self> {
        if self.lifecycle == Lifecycle::Singleton && self.cached.is_poisoned() {
            return Err(Error::Clone {
                type_name: self.target.name(),
            });
        }

        Ok(Self {
            target: self.target,
            lifecycle: self.lifecycle,
            cached: Arc::clone(&self.cached),
        })
    }

    #[cfg(test)]
    fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.cached.write();
            panic!("poisoning the singleton slot");
        }));
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.lifecycle == other.lifecycle
            && match (self.cached(), other.cached()) {
                (None, None) => true,
                (Some(mine), Some(theirs)) => Instance::ptr_eq(&mine, &theirs),
                _ => false,
            }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &self.target.name())
            .field("lifecycle", &self.lifecycle)
            .field("cached", &self.cached())
            .finish()
    }
}

/// The resolution entry point.
///
/// A registry holds explicit [`Binding`]s, the namespace prefixes whose types may be
/// resolved without one, and two toggles for member injection. Every method takes
/// `&self`, so a registry can be shared between threads.
///
/// # Error policy
///
/// [`get`](Self::get), [`resolve`](Self::resolve) and the two bulk injection passes
/// never fail: problems are logged and surface as `None` or an untouched member.
/// [`invoke`](Self::invoke) and [`invoke_named`](Self::invoke_named) return errors to
/// the caller.
///
/// # Examples
///
/// ```
/// use wireup::{Describe, Lifecycle, Registry, TypeInfo, TypeShape};
///
/// #[derive(Default)]
/// struct Settings;
///
/// impl Describe for Settings {
///     fn type_info() -> TypeInfo {
///         TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
///     }
/// }
///
/// let registry = Registry::new(module_path!());
/// registry.add_mapping::<Settings>(Lifecycle::Singleton);
///
/// let first = registry.get::<Settings>().unwrap();
/// let second = registry.get::<Settings>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
pub struct Registry {
    bindings: DashMap<TypeId, Arc<Binding>>,
    namespaces: DashSet<String>,
    inject_properties: AtomicBool,
    inject_setters: AtomicBool,
    // Built shapes, shared with copies.
    shapes: Arc<DashMap<TypeId, Arc<TypeShape>>>,
}

impl Registry {
    /// Creates a registry that may resolve types under `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_namespaces([namespace.into()])
    }

    /// Creates a registry that may resolve types under any of `namespaces`.
    #[must_use]
    pub fn with_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(namespaces.into_iter().map(Into::into).collect(), true, true)
    }

    /// Starts configuring a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn from_parts(namespaces: DashSet<String>, inject_properties: bool, inject_setters: bool) -> Self {
        Self {
            bindings: DashMap::new(),
            namespaces,
            inject_properties: AtomicBool::new(inject_properties),
            inject_setters: AtomicBool::new(inject_setters),
            shapes: Arc::default(),
        }
    }

    /// Binds `T` to itself with the given lifecycle.
    pub fn add_mapping<T: Describe>(&self, lifecycle: Lifecycle) {
        self.add_mapping_for(TypeInfo::of::<T>(), lifecycle);
    }

    /// Binds `ty` to itself with the given lifecycle.
    pub fn add_mapping_for(&self, ty: TypeInfo, lifecycle: Lifecycle) {
        self.add_binding_for(ty, Binding::new(ty, lifecycle));
    }

    /// Serves requests for `K` from `binding`, replacing any previous binding for `K`.
    ///
    /// The binding may target another type than `K`; [`get`](Self::get) then fails to
    /// downcast, while [`resolve`](Self::resolve) hands out the target's instance.
    pub fn add_binding<K: Describe>(&self, binding: Binding) {
        self.add_binding_for(TypeInfo::of::<K>(), binding);
    }

    /// Serves requests for `key` from `binding`, replacing any previous binding for `key`.
    pub fn add_binding_for(&self, key: TypeInfo, binding: Binding) {
        self.bindings.insert(key.id(), Arc::new(binding));
    }

    /// Registers `value` as the singleton of its own type.
    pub fn add_instance<T: Describe>(&self, value: T) {
        self.add_singleton(Instance::new(value));
    }

    /// Registers `instance` as the singleton of its runtime type.
    pub fn add_singleton(&self, instance: Instance) {
        let key = instance.type_info();
        self.add_binding_for(key, Binding::from_instance(instance));
    }

    /// Adds a namespace prefix whose types may be resolved without a binding.
    pub fn add_working_package(&self, namespace: impl Into<String>) {
        self.namespaces.insert(namespace.into());
    }

    /// The registered namespace prefixes, sorted.
    #[must_use]
    pub fn working_packages(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.namespaces.iter().map(|namespace| namespace.key().clone()).collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Whether an explicit binding exists for `T`.
    #[must_use]
    pub fn has_mapping<T: Describe>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// The explicit binding for `ty`, if there is one.
    #[must_use]
    pub fn binding_for(&self, ty: &TypeInfo) -> Option<Arc<Binding>> {
        self.bindings.get(&ty.id()).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `T` may and can be produced.
    #[must_use]
    pub fn is_eligible<T: Describe>(&self) -> bool {
        self.eligible(&TypeInfo::of::<T>())
    }

    /// Whether `ty` may and can be produced.
    ///
    /// Mapped types are always eligible. Otherwise scalars and scalar arrays never are,
    /// nor are types without a namespace or outside every registered prefix, nor a type
    /// this thread is currently constructing. The remaining types are eligible when
    /// [`Binding::is_constructible`] agrees.
    #[must_use]
    pub fn eligible(&self, ty: &TypeInfo) -> bool {
        if self.bindings.contains_key(&ty.id()) {
            return true;
        }
        if ty.kind().is_primitive() {
            return false;
        }
        let Some(namespace) = ty.namespace() else {
            return false;
        };
        if !self.namespaces.iter().any(|prefix| namespace.starts_with(prefix.key().as_str())) {
            return false;
        }

        if trail::is_active(ty.id(), Stage::Construction) {
            tracing::debug!(type.name = ty.name(), "type is already under construction");
            return false;
        }
        let Some(_step) = trail::enter(ty.id(), Stage::Eligibility) else {
            tracing::debug!(type.name = ty.name(), "dependency cycle detected during eligibility check");
            return false;
        };
        Binding::is_constructible(ty, self)
    }

    /// Returns an instance of `T`, or `None` if none can be produced.
    ///
    /// Failures are logged. See [`resolve`](Self::resolve).
    #[must_use]
    pub fn get<T: Describe>(&self) -> Option<Arc<T>> {
        downcast_resolved(self.resolve(&TypeInfo::of::<T>())?)
    }

    /// Returns an instance of `ty`, or `None` if none can be produced.
    ///
    /// Mapped types resolve through their binding; anything else is built by a
    /// throwaway transient binding. Failures are logged at error level.
    #[must_use]
    pub fn resolve(&self, ty: &TypeInfo) -> Option<Instance> {
        let outcome = match self.binding_for(ty) {
            Some(binding) => binding.resolve(self),
            None => Binding::new(*ty, Lifecycle::Transient).resolve(self),
        };

        outcome
            .inspect_err(|error| {
                tracing::event!(
                    name: "wireup.resolve",
                    Level::ERROR,
                    type.name = ty.name(),
                    error = %error,
                    "unable to get an instance"
                );
            })
            .ok()
    }

    /// Returns an instance of `T`, using `extras` as additional singletons.
    ///
    /// See [`resolve_with`](Self::resolve_with).
    #[must_use]
    pub fn get_with<T, I>(&self, extras: I) -> Option<Arc<T>>
    where
        T: Describe,
        I: IntoIterator<Item = Instance>,
    {
        downcast_resolved(self.resolve_with(&TypeInfo::of::<T>(), extras)?)
    }

    /// Returns an instance of `ty`, using `extras` as additional singletons.
    ///
    /// The extras are registered on a [`copy`](Self::copy) of this registry, so this
    /// registry is never modified. If the copy fails, the extras are dropped with a
    /// warning and `ty` is resolved against this registry.
    #[must_use]
    pub fn resolve_with<I>(&self, ty: &TypeInfo, extras: I) -> Option<Instance>
    where
        I: IntoIterator<Item = Instance>,
    {
        match self.copy() {
            Ok(scoped) => {
                for extra in extras {
                    scoped.add_singleton(extra);
                }
                scoped.resolve(ty)
            }
            Err(error) => {
                tracing::event!(
                    name: "wireup.copy",
                    Level::WARN,
                    type.name = ty.name(),
                    error = %error,
                    "unable to copy the registry, skipping extra parameters"
                );
                self.resolve(ty)
            }
        }
    }

    /// Assigns resolved values to every marked field of `target`.
    ///
    /// A field that cannot be assigned is logged and skipped.
    pub fn inject_into_fields<T: Describe>(&self, target: &mut T) {
        self.inject_fields_dyn(&TypeInfo::of::<T>(), target);
    }

    /// Type-erased form of [`inject_into_fields`](Self::inject_into_fields).
    pub fn inject_fields_dyn(&self, ty: &TypeInfo, target: &mut dyn Any) {
        let Some(shape) = self.shape_of(ty) else {
            return;
        };

        for field in shape.fields().iter().filter(|field| field.is_marked()) {
            let value = self.resolve(&field.type_info());
            if let Err(error) = field.assign(target, value) {
                tracing::event!(
                    name: "wireup.inject_field",
                    Level::WARN,
                    type.name = ty.name(),
                    member.name = field.name(),
                    error = %error,
                    "can't inject into field"
                );
            }
        }
    }

    /// Calls every eligible `set_*` method of `target` that takes one parameter.
    ///
    /// Eligible means marked for injection with an eligible parameter type. A setter
    /// that fails is logged and skipped.
    pub fn inject_into_setters<T: Describe>(&self, target: &mut T) {
        self.inject_setters_dyn(&TypeInfo::of::<T>(), target);
    }

    /// Type-erased form of [`inject_into_setters`](Self::inject_into_setters).
    pub fn inject_setters_dyn(&self, ty: &TypeInfo, target: &mut dyn Any) {
        let Some(shape) = self.shape_of(ty) else {
            return;
        };

        let setters = shape
            .methods()
            .iter()
            .filter(|method| method.name().starts_with(SETTER_PREFIX) && method.params().len() == 1);

        for setter in setters {
            if !self.is_method_eligible(setter, false) {
                continue;
            }
            if let Err(error) = self.invoke_dyn(target, setter) {
                tracing::event!(
                    name: "wireup.inject_setter",
                    Level::WARN,
                    type.name = ty.name(),
                    member.name = setter.name(),
                    error = %error,
                    "can't inject into setter"
                );
            }
        }
    }

    /// Calls `method` on `target` with resolved arguments and returns its result.
    ///
    /// Arguments that cannot be resolved are passed as empty slots. Access and
    /// invocation failures are returned unchanged.
    pub fn invoke<T: Describe>(&self, target: &mut T, method: &Method) -> Result<Instance> {
        self.invoke_dyn(target, method)
    }

    /// Type-erased form of [`invoke`](Self::invoke).
    pub fn invoke_dyn(&self, target: &mut dyn Any, method: &Method) -> Result<Instance> {
        let mut args = self.resolve_all(method.params());
        method.call(target, &mut args)
    }

    /// Calls the first public method of `target` named `name` whose parameters are
    /// all eligible, with resolved arguments.
    ///
    /// The injection marker is not required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`] when no method qualifies, and otherwise
    /// whatever [`invoke`](Self::invoke) returns.
    pub fn invoke_named<T: Describe>(&self, target: &mut T, name: &str) -> Result<Instance> {
        self.invoke_named_dyn(&TypeInfo::of::<T>(), target, name)
    }

    /// Type-erased form of [`invoke_named`](Self::invoke_named).
    pub fn invoke_named_dyn(&self, ty: &TypeInfo, target: &mut dyn Any, name: &str) -> Result<Instance> {
        let shape = self.shape_of(ty);
        let method = shape.as_ref().and_then(|shape| {
            shape
                .methods()
                .iter()
                .filter(|method| method.visibility() == Visibility::Public && method.name() == name)
                .find(|method| self.is_method_eligible(method, true))
        });

        match method {
            Some(method) => self.invoke_dyn(target, method),
            None => Err(Error::MethodNotFound {
                type_name: ty.name(),
                method: name.to_owned(),
            }),
        }
    }

    /// Whether `method` can be called with injected arguments.
    ///
    /// Unless `force` is set the method must carry the injection marker. Every
    /// parameter type must be eligible either way.
    #[must_use]
    pub fn is_method_eligible(&self, method: &Method, force: bool) -> bool {
        (force || method.is_marked()) && method.params().iter().all(|param| self.eligible(param))
    }

    /// Whether new instances receive field injection.
    #[must_use]
    pub fn injects_properties(&self) -> bool {
        self.inject_properties.load(Ordering::Relaxed)
    }

    /// Enables or disables field injection for new instances.
    pub fn set_inject_properties(&self, enabled: bool) {
        self.inject_properties.store(enabled, Ordering::Relaxed);
    }

    /// Whether new instances receive setter injection.
    #[must_use]
    pub fn injects_setters(&self) -> bool {
        self.inject_setters.load(Ordering::Relaxed)
    }

    /// Enables or disables setter injection for new instances.
    pub fn set_inject_setters(&self, enabled: bool) {
        self.inject_setters.store(enabled, Ordering::Relaxed);
    }

    /// Copies this registry.
    ///
    /// The copy has its own binding map and namespace set. Singleton bindings are
    /// duplicated with [`Binding::duplicate`], so the copy hands out the same cached
    /// instances until it rebinds them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clone`] when a cached singleton cannot be read.
    pub fn copy(&self) -> Result<Self> {
        let bindings = DashMap::with_capacity(self.bindings.len());
        for (key, binding) in self.snapshot() {
            bindings.insert(key, Arc::new(binding.duplicate()?));
        }

        Ok(Self {
            bindings,
            namespaces: self.namespaces.clone(),
            inject_properties: AtomicBool::new(self.injects_properties()),
            inject_setters: AtomicBool::new(self.injects_setters()),
            shapes: Arc::clone(&self.shapes),
        })
    }

    /// The shape of `ty`, built on first use and cached for this registry and its copies.
    ///
    /// A type's shape is assumed never to change.
    pub(crate) fn shape_of(&self, ty: &TypeInfo) -> Option<Arc<TypeShape>> {
        if let Some(shape) = self.shapes.get(&ty.id()) {
            return Some(Arc::clone(shape.value()));
        }

        let built = Arc::new(ty.shape()?);
        Some(Arc::clone(self.shapes.entry(ty.id()).or_insert(built).value()))
    }

    fn resolve_all(&self, params: &[TypeInfo]) -> Arguments {
        Arguments::new(params.iter().map(|param| self.resolve(param)).collect())
    }

    fn snapshot(&self) -> Vec<(TypeId, Arc<Binding>)> {
        self.bindings
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    fn namespace_set(&self) -> HashSet<String> {
        self.namespaces.iter().map(|namespace| namespace.key().clone()).collect()
    }
}

fn downcast_resolved<T: Describe>(instance: Instance) -> Option<Arc<T>> {
    let value = instance.downcast::<T>();
    if value.is_none() {
        tracing::event!(
            name: "wireup.downcast",
            Level::DEBUG,
            type.name = type_name::<T>(),
            resolved.name = instance.type_info().name(),
            "resolved instance has another type"
        );
    }
    value
}

impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.injects_properties() != other.injects_properties()
            || self.injects_setters() != other.injects_setters()
            || self.namespace_set() != other.namespace_set()
        {
            return false;
        }

        let mine = self.snapshot();
        mine.len() == other.bindings.len()
            && mine
                .iter()
                .all(|(key, binding)| other.bindings.get(key).is_some_and(|theirs| **theirs.value() == **binding))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings.len())
            .field("namespaces", &self.working_packages())
            .field("inject_properties", &self.injects_properties())
            .field("inject_setters", &self.injects_setters())
            .finish()
    }
}
