// src/exec/fault.rs

//! Fault normalization.
//!
//! [`invoke`] is the one place a task's work function is called. Whatever
//! happens in there (a normal return, an `Err`, or a panic raised either while
//! building the future or while polling it) comes out as a [`TaskOutcome`].
//!
//! Panic payloads are `Box<dyn Any + Send>`; [`PanicPayload`] turns them into
//! a comparable value. Every payload is a fault, including `false`, `0`, `""`
//! and `()`.

use std::any::{Any, TypeId};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;

use crate::context::Context;
use crate::errors::ExecError;
use crate::task::Task;

/// Value a task panicked with.
///
/// Strings, booleans, numbers and `()` compare by value. An [`Opaque`]
/// payload compares equal only to clones of itself; use
/// [`PanicPayload::with_payload`] to compare its contents.
///
/// [`Opaque`]: PanicPayload::Opaque
#[derive(Debug, Clone, PartialEq)]
pub enum PanicPayload {
    /// `&'static str` or `String` payloads, e.g. from `panic!("...")`.
    Message(String),
    Bool(bool),
    /// Any primitive integer that fits in an `i128`.
    Int(i128),
    Float(f64),
    Unit,
    /// Any other payload type, kept as raised.
    Opaque(OpaquePayload),
}

/// A panic payload of a type [`PanicPayload`] does not classify.
///
/// Cloning shares the payload. Two values are equal when they share the same
/// payload, so separate panics never compare equal even with equal contents.
#[derive(Clone)]
pub struct OpaquePayload {
    type_id: TypeId,
    value: Arc<Mutex<Box<dyn Any + Send>>>,
}

impl OpaquePayload {
    fn new(value: Box<dyn Any + Send>) -> Self {
        Self {
            type_id: (*value).type_id(),
            value: Arc::new(Mutex::new(value)),
        }
    }

    /// `TypeId` of the value passed to `panic_any`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Run `f` on the payload if it is a `T`.
    pub fn with_payload<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        value.downcast_ref::<T>().map(f)
    }
}

impl PartialEq for OpaquePayload {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for OpaquePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaquePayload")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

impl PanicPayload {
    /// Classify a raw payload as returned by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<&'static str>() {
            Ok(s) => return PanicPayload::Message((*s).to_string()),
            Err(p) => p,
        };
        let payload = match payload.downcast::<String>() {
            Ok(s) => return PanicPayload::Message(*s),
            Err(p) => p,
        };
        let payload = match payload.downcast::<bool>() {
            Ok(b) => return PanicPayload::Bool(*b),
            Err(p) => p,
        };
        let payload = match payload.downcast::<()>() {
            Ok(_) => return PanicPayload::Unit,
            Err(p) => p,
        };
        let payload = match payload.downcast::<f64>() {
            Ok(x) => return PanicPayload::Float(*x),
            Err(p) => p,
        };
        let payload = match payload.downcast::<f32>() {
            Ok(x) => return PanicPayload::Float(f64::from(*x)),
            Err(p) => p,
        };

        macro_rules! int {
            ($payload:ident, $($ty:ty),+) => {
                $(
                    let $payload = match $payload.downcast::<$ty>() {
                        Ok(n) => return PanicPayload::Int(i128::from(*n)),
                        Err(p) => p,
                    };
                )+
            };
        }
        int!(payload, i32, i64, u32, u64, i8, i16, u8, u16);

        let payload = match payload.downcast::<usize>() {
            Ok(n) => return PanicPayload::Int(*n as i128),
            Err(p) => p,
        };
        let payload = match payload.downcast::<isize>() {
            Ok(n) => return PanicPayload::Int(*n as i128),
            Err(p) => p,
        };
        let payload = match payload.downcast::<i128>() {
            Ok(n) => return PanicPayload::Int(*n),
            Err(p) => p,
        };
        if let Some(n) = payload.downcast_ref::<u128>() {
            if let Ok(n) = i128::try_from(*n) {
                return PanicPayload::Int(n);
            }
        }

        PanicPayload::Opaque(OpaquePayload::new(payload))
    }

    /// Message text for string payloads.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PanicPayload::Message(s) => Some(s),
            _ => None,
        }
    }

    /// Run `f` on an opaque payload if it is a `T`.
    ///
    /// Classified payloads are not opaque; match on them instead.
    pub fn with_payload<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        match self {
            PanicPayload::Opaque(opaque) => opaque.with_payload(f),
            _ => None,
        }
    }

    /// Clone an opaque payload of type `T` out.
    pub fn downcast_cloned<T: Any + Clone>(&self) -> Option<T> {
        self.with_payload(T::clone)
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanicPayload::Message(s) => f.write_str(s),
            PanicPayload::Bool(b) => write!(f, "{b}"),
            PanicPayload::Int(n) => write!(f, "{n}"),
            PanicPayload::Float(x) => write!(f, "{x}"),
            PanicPayload::Unit => f.write_str("()"),
            PanicPayload::Opaque(_) => f.write_str("<non-displayable panic payload>"),
        }
    }
}

impl From<&str> for PanicPayload {
    fn from(s: &str) -> Self {
        PanicPayload::Message(s.to_string())
    }
}

impl From<String> for PanicPayload {
    fn from(s: String) -> Self {
        PanicPayload::Message(s)
    }
}

impl From<bool> for PanicPayload {
    fn from(b: bool) -> Self {
        PanicPayload::Bool(b)
    }
}

impl From<()> for PanicPayload {
    fn from(_: ()) -> Self {
        PanicPayload::Unit
    }
}

impl From<f64> for PanicPayload {
    fn from(x: f64) -> Self {
        PanicPayload::Float(x)
    }
}

macro_rules! from_int {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for PanicPayload {
                fn from(n: $ty) -> Self {
                    PanicPayload::Int(i128::from(n))
                }
            }
        )+
    };
}
from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

/// Normalized result of running one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<E> {
    Success,
    Failed(E),
    Panicked(PanicPayload),
}

impl<E> TaskOutcome<E> {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    pub fn into_result(self) -> Result<(), ExecError<E>> {
        match self {
            TaskOutcome::Success => Ok(()),
            TaskOutcome::Failed(err) => Err(ExecError::Failed(err)),
            TaskOutcome::Panicked(payload) => Err(ExecError::Panicked(payload)),
        }
    }
}

impl<E> From<Result<(), E>> for TaskOutcome<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => TaskOutcome::Success,
            Err(err) => TaskOutcome::Failed(err),
        }
    }
}

/// Run `task`'s work function with `ctx`, intercepting panics.
pub async fn invoke<E: Send + 'static>(task: &Task<E>, ctx: Context) -> TaskOutcome<E> {
    let work = task.work();

    let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| work(ctx))) {
        Ok(fut) => fut,
        Err(payload) => return TaskOutcome::Panicked(PanicPayload::from_panic(payload)),
    };

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result.into(),
        Err(payload) => TaskOutcome::Panicked(PanicPayload::from_panic(payload)),
    }
}
