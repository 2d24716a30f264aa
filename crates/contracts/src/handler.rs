//! Handler contracts
//!
//! A [`Handler`] is anything that can be called with an [`Args`] list.
//! [`Callback`] is the shared, identity-comparable handle the dispatcher
//! stores, and [`IntoCallback`] is the conversion every subscribe call
//! goes through.

use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{Args, ContractError};

/// Uniform "call with an argument list" capability
pub trait Handler: Send + Sync + 'static {
    /// Invoke the handler
    ///
    /// # Errors
    /// `ArgumentMismatch` when `args` does not fit the handler's parameters,
    /// `HandlerFailed` when the handler body reports an error.
    fn call(&self, args: &Args) -> Result<(), ContractError>;

    /// Number of parameters, or `None` for handlers that accept any arity
    fn arity(&self) -> Option<usize> {
        None
    }

    /// Human-readable name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Return types accepted from typed handler closures
pub trait HandlerOutput {
    fn into_outcome(self) -> Result<(), ContractError>;
}

impl HandlerOutput for () {
    fn into_outcome(self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl<E: fmt::Display> HandlerOutput for Result<(), E> {
    fn into_outcome(self) -> Result<(), ContractError> {
        self.map_err(|e| ContractError::handler_failed(e.to_string()))
    }
}

/// Shared handle to a registered handler
///
/// Cloning is cheap and preserves identity: two clones compare equal, two
/// callbacks built from separate closures never do. Identity is what
/// `unsubscribe` matches on.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<dyn Handler>,
}

impl Callback {
    /// Wrap a typed closure
    ///
    /// # Examples
    /// ```
    /// use contracts::{args, Callback};
    ///
    /// let add = Callback::new(|a: i64, b: i64| assert_eq!(a + b, 3));
    /// assert_eq!(add.arity(), Some(2));
    /// add.call(&args![1, 2]).unwrap();
    /// assert!(add.call(&args![1]).is_err());
    /// ```
    pub fn new<F, M>(f: F) -> Self
    where
        F: TypedFn<M>,
        M: 'static,
    {
        Self::from_handler(FnHandler {
            f,
            _marker: PhantomData,
        })
    }

    /// Wrap a hand-written [`Handler`] implementation
    pub fn from_handler<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// Invoke the underlying handler
    pub fn call(&self, args: &Args) -> Result<(), ContractError> {
        self.inner.call(args)
    }

    /// Declared parameter count, if fixed
    pub fn arity(&self) -> Option<usize> {
        self.inner.arity()
    }

    /// Handler name used in logs
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Whether both handles refer to the same registered handler
    pub fn same_as(&self, other: &Callback) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}

/// Conversion from a value offered to `subscribe*` into a [`Callback`]
///
/// `M` is a marker that lets closures of different arities coexist; it is
/// always inferred.
pub trait IntoCallback<M> {
    /// # Errors
    /// `InvalidHandler` when the value is not invocable.
    fn into_callback(self) -> Result<Callback, ContractError>;
}

#[doc(hidden)]
pub struct Prebuilt;

#[doc(hidden)]
pub struct MaybePrebuilt;

impl IntoCallback<Prebuilt> for Callback {
    fn into_callback(self) -> Result<Callback, ContractError> {
        Ok(self)
    }
}

impl IntoCallback<Prebuilt> for &Callback {
    fn into_callback(self) -> Result<Callback, ContractError> {
        Ok(self.clone())
    }
}

impl IntoCallback<MaybePrebuilt> for Option<Callback> {
    fn into_callback(self) -> Result<Callback, ContractError> {
        self.ok_or_else(|| ContractError::invalid_handler("no callable value supplied"))
    }
}

/// Closures with a fixed, typed parameter list
///
/// Implemented for `Fn(A1, .., An) -> R` with up to eight parameters, where
/// every parameter is `DeserializeOwned` and `R` is a [`HandlerOutput`].
pub trait TypedFn<M>: Send + Sync + 'static {
    /// Parameter count
    const ARITY: usize;

    /// Decode `args` and run the closure
    fn invoke(&self, args: &Args) -> Result<(), ContractError>;
}

struct FnHandler<F, M> {
    f: F,
    _marker: PhantomData<fn() -> M>,
}

impl<F, M> Handler for FnHandler<F, M>
where
    F: TypedFn<M>,
    M: 'static,
{
    fn call(&self, args: &Args) -> Result<(), ContractError> {
        self.f.invoke(args)
    }

    fn arity(&self) -> Option<usize> {
        Some(F::ARITY)
    }

    fn name(&self) -> &str {
        std::any::type_name::<F>()
    }
}

fn decode<T: DeserializeOwned>(
    args: &Args,
    index: usize,
    expected: usize,
) -> Result<T, ContractError> {
    let value = args
        .get(index)
        .cloned()
        .ok_or_else(|| ContractError::arity_mismatch(expected, args.len()))?;
    serde_json::from_value(value)
        .map_err(|e| ContractError::argument_type(expected, args.len(), index, e.to_string()))
}

macro_rules! impl_typed_fn {
    ($arity:expr; $($ty:ident => $idx:tt),*) => {
        impl<F, R, $($ty,)*> TypedFn<(R, $($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: HandlerOutput + 'static,
            $($ty: DeserializeOwned + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn invoke(&self, args: &Args) -> Result<(), ContractError> {
                if args.len() != Self::ARITY {
                    return Err(ContractError::arity_mismatch(Self::ARITY, args.len()));
                }
                (self)($(decode::<$ty>(args, $idx, Self::ARITY)?),*).into_outcome()
            }
        }

        impl<F, R, $($ty,)*> IntoCallback<(R, $($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: HandlerOutput + 'static,
            $($ty: DeserializeOwned + 'static,)*
        {
            fn into_callback(self) -> Result<Callback, ContractError> {
                Ok(Callback::new(self))
            }
        }
    };
}

impl_typed_fn!(0;);
impl_typed_fn!(1; A1 => 0);
impl_typed_fn!(2; A1 => 0, A2 => 1);
impl_typed_fn!(3; A1 => 0, A2 => 1, A3 => 2);
impl_typed_fn!(4; A1 => 0, A2 => 1, A3 => 2, A4 => 3);
impl_typed_fn!(5; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4);
impl_typed_fn!(6; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5);
impl_typed_fn!(7; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5, A7 => 6);
impl_typed_fn!(8; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5, A7 => 6, A8 => 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_typed_closure_decodes_args() {
        let total = Arc::new(AtomicI64::new(0));
        let sink = Arc::clone(&total);
        let cb = Callback::new(move |a: i64, label: String| {
            assert_eq!(label, "x");
            sink.fetch_add(a, Ordering::SeqCst);
        });

        cb.call(&args![5, "x"]).unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(cb.arity(), Some(2));
    }

    #[test]
    fn test_arity_mismatch() {
        let cb = Callback::new(|_: i64, _: i64| {});
        let err = cb.call(&args![1]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::ArgumentMismatch {
                expected: 2,
                got: 1,
                index: None,
                ..
            }
        ));
    }

    #[test]
    fn test_type_mismatch_reports_position() {
        let cb = Callback::new(|_: i64, _: bool| {});
        let err = cb.call(&args![1, "yes"]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::ArgumentMismatch {
                index: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn test_result_output_maps_to_handler_failed() {
        let cb = Callback::new(|n: u32| -> Result<(), String> {
            if n == 0 {
                Err("zero".to_string())
            } else {
                Ok(())
            }
        });
        assert!(cb.call(&args![1]).is_ok());
        let err = cb.call(&args![0]).unwrap_err();
        assert_eq!(err.to_string(), "handler failed: zero");
    }

    #[test]
    fn test_identity() {
        let a = Callback::new(|| {});
        let b = Callback::new(|| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_into_callback_rejects_missing_value() {
        let err = None::<Callback>.into_callback().unwrap_err();
        assert!(matches!(err, ContractError::InvalidHandler { .. }));

        let cb = Callback::new(|| {});
        assert!(Some(cb.clone()).into_callback().is_ok());
        assert!((|x: i64| assert!(x > 0)).into_callback().is_ok());
    }

    struct Variadic;

    impl Handler for Variadic {
        fn call(&self, args: &Args) -> Result<(), ContractError> {
            if args.iter().all(|v| v.is_number()) {
                Ok(())
            } else {
                Err(ContractError::handler_failed("non-numeric argument"))
            }
        }
    }

    #[test]
    fn test_hand_written_handler() {
        let cb = Callback::from_handler(Variadic);
        assert_eq!(cb.arity(), None);
        assert!(cb.call(&args![1, 2, 3]).is_ok());
        assert!(cb.call(&args!["a"]).is_err());
    }
}
