// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::describe::{Describe, TypeInfo};

/// A type-erased, shared value together with its runtime type.
///
/// Cloning an `Instance` clones the reference, not the value.
#[derive(Clone)]
pub struct Instance {
    info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wraps a value.
    pub fn new<T: Describe>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps a value that is already shared.
    pub fn from_arc<T: Describe>(value: Arc<T>) -> Self {
        Self {
            info: T::type_info(),
            value,
        }
    }

    pub(crate) fn from_boxed(info: TypeInfo, value: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            info,
            value: Arc::from(value),
        }
    }

    /// The runtime type of the wrapped value.
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// Returns the value as a `T`, if it is one.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Borrows the value as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether both instances refer to the same value.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&this.value), Arc::as_ptr(&other.value))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.info.name())
            .field("at", &Arc::as_ptr(&self.value).cast::<()>())
            .finish()
    }
}
