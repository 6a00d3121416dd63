//! Classification of the values a routine hands to its driver.
use crate::{Deferred, ReadyRoutine, RoutineFn};
use std::fmt;

/// A value handed from a suspended [Routine][crate::Routine] to the code driving it.
///
/// The variant is decided once, when the value is constructed, and the driver dispatches on it
/// in declaration order.
pub enum Yielded<T, E> {
    /// Asynchronous work that is already in flight
    Deferred(Deferred<T, E>),
    /// A routine instance to be driven to completion
    Routine(Box<ReadyRoutine<T, E>>),
    /// A constructor for a routine to be driven to completion
    RoutineFn(RoutineFn<T, E>),
    /// Anything else: handed back to the routine unchanged after one scheduler tick
    Value(T),
}

/// The classification of a [Yielded] value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// See [Yielded::Deferred]
    Deferred,
    /// See [Yielded::Routine]
    Routine,
    /// See [Yielded::RoutineFn]
    RoutineFn,
    /// See [Yielded::Value]
    Value,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deferred => "deferred",
            Self::Routine => "routine",
            Self::RoutineFn => "routine-fn",
            Self::Value => "value",
        };

        f.write_str(s)
    }
}

impl<T, E> Yielded<T, E> {
    /// The classification of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Deferred(_) => Kind::Deferred,
            Self::Routine(_) => Kind::Routine,
            Self::RoutineFn(_) => Kind::RoutineFn,
            Self::Value(_) => Kind::Value,
        }
    }

    /// Whether this is a deferred result.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Whether this is a routine instance.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::Routine(_))
    }

    /// Whether this is a routine constructor.
    pub fn is_routine_fn(&self) -> bool {
        matches!(self, Self::RoutineFn(_))
    }
}

impl<T, E> fmt::Debug for Yielded<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Yielded").field(&self.kind()).finish()
    }
}

impl<T, E> From<Deferred<T, E>> for Yielded<T, E> {
    fn from(d: Deferred<T, E>) -> Self {
        Self::Deferred(d)
    }
}

impl<T, E> From<ReadyRoutine<T, E>> for Yielded<T, E> {
    fn from(r: ReadyRoutine<T, E>) -> Self {
        Self::Routine(Box::new(r))
    }
}

impl<T, E> From<RoutineFn<T, E>> for Yielded<T, E> {
    fn from(f: RoutineFn<T, E>) -> Self {
        Self::RoutineFn(f)
    }
}
