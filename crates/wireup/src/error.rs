// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;

/// A specialized `Result` type for resolution operations that return a
/// [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised while producing an instance or injecting one into a member.
///
/// Only the explicit entry points ([`Registry::invoke`], [`Registry::invoke_named`],
/// [`Registry::copy`] and the [`Binding`] methods) return this error. The implicit
/// paths ([`Registry::get`], [`Registry::resolve`] and the bulk injection passes)
/// log it and carry on.
///
/// [`Registry::invoke`]: crate::Registry::invoke
/// [`Registry::invoke_named`]: crate::Registry::invoke_named
/// [`Registry::copy`]: crate::Registry::copy
/// [`Registry::get`]: crate::Registry::get
/// [`Registry::resolve`]: crate::Registry::resolve
/// [`Binding`]: crate::Binding
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No constructor of the type could be used, or the type cannot be created at all.
    #[error("cannot construct `{type_name}`: {reason}")]
    Construction {
        /// The type that was requested.
        type_name: &'static str,
        /// Why construction was refused.
        reason: ConstructionFailure,
    },

    /// A field or method cannot be reached, even with access control bypassed.
    #[error("`{member}` of `{type_name}` is not accessible: {reason}")]
    Access {
        /// The type declaring the member.
        type_name: &'static str,
        /// The member name.
        member: Cow<'static, str>,
        /// Why access was refused.
        reason: AccessFailure,
    },

    /// A constructor or method ran and reported a failure.
    #[error("`{member}` of `{type_name}` failed")]
    Invocation {
        /// The type declaring the member.
        type_name: &'static str,
        /// The member name.
        member: Cow<'static, str>,
        /// The error reported by the member itself.
        #[source]
        source: InvocationError,
    },

    /// No method with the requested name can be called with injected arguments.
    #[error("no injectable method `{method}` on `{type_name}`")]
    MethodNotFound {
        /// The type that was searched.
        type_name: &'static str,
        /// The method name that was looked up.
        method: String,
    },

    /// A registry could not be duplicated.
    #[error("cannot copy the binding for `{type_name}`: its cached instance is unreadable")]
    Clone {
        /// The target type of the binding that could not be duplicated.
        type_name: &'static str,
    },
}

/// A fieldless mirror of the [`Error`][enum@Error] variants, for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`Error::Construction`].
    Construction,
    /// See [`Error::Access`].
    Access,
    /// See [`Error::Invocation`].
    Invocation,
    /// See [`Error::MethodNotFound`].
    MethodNotFound,
    /// See [`Error::Clone`].
    Clone,
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Construction { .. } => ErrorKind::Construction,
            Self::Access { .. } => ErrorKind::Access,
            Self::Invocation { .. } => ErrorKind::Invocation,
            Self::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            Self::Clone { .. } => ErrorKind::Clone,
        }
    }

    pub(crate) const fn construction(type_name: &'static str, reason: ConstructionFailure) -> Self {
        Self::Construction { type_name, reason }
    }

    pub(crate) fn access(type_name: &'static str, member: impl Into<Cow<'static, str>>, reason: AccessFailure) -> Self {
        Self::Access {
            type_name,
            member: member.into(),
            reason,
        }
    }

    pub(crate) fn invocation(type_name: &'static str, member: impl Into<Cow<'static, str>>, source: InvocationError) -> Self {
        Self::Invocation {
            type_name,
            member: member.into(),
            source,
        }
    }
}

/// Why a type could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ConstructionFailure {
    /// The type has public constructors but none has only eligible parameters.
    NoEligibleConstructor,
    /// The type has no public constructors and no default construction path.
    NotInstantiable,
    /// The type is already being constructed further up the current resolution.
    Cycle,
}

impl fmt::Display for ConstructionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoEligibleConstructor => "no constructor has only eligible parameters",
            Self::NotInstantiable => "the type has no default construction path",
            Self::Cycle => "the type depends on itself",
        })
    }
}

/// Why a member could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AccessFailure {
    /// The member is sealed and refuses access.
    Sealed,
    /// The target object is not of the type that declares the member.
    Receiver,
    /// The value offered to the member is not of its declared type.
    ValueType,
}

impl fmt::Display for AccessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sealed => "the member is sealed",
            Self::Receiver => "the target is not of the declaring type",
            Self::ValueType => "the value is not of the declared type",
        })
    }
}

/// The failure a constructor or method reports from its own body.
///
/// Constructors and methods registered on a [`TypeShape`](crate::TypeShape) return this
/// error; the registry wraps it into [`Error::Invocation`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct InvocationError {
    message: Cow<'static, str>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl InvocationError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error with the given message, caused by another error.
    pub fn caused_by(message: impl Into<Cow<'static, str>>, source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn missing_argument(position: usize, type_name: &'static str) -> Self {
        Self::new(format!("argument #{position} (`{type_name}`) could not be resolved"))
    }

    pub(crate) fn mismatched_argument(position: usize, type_name: &'static str) -> Self {
        Self::new(format!("argument #{position} is not a `{type_name}`"))
    }

    pub(crate) fn exhausted(position: usize) -> Self {
        Self::new(format!("argument #{position} was requested but not declared"))
    }
}
