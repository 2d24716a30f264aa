//! Args - argument list carried by a publish
//!
//! Arguments are dynamically typed `serde_json::Value`s; handlers decode them
//! into their declared parameter types at call time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Ordered argument list supplied to `publish`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Vec<Value>);

impl Args {
    /// Create an empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Argument at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Append an already-encoded argument
    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Borrow the arguments as a slice
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Iterate over the arguments in order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Build an [`Args`] list from expressions, each encoded with `serde_json::json!`
///
/// Elements follow `json!` array syntax: literals, JSON object/array
/// literals and arbitrary serializable expressions (`-5`, `a + b`,
/// `v.len()`) may be mixed.
///
/// # Examples
/// ```
/// use contracts::args;
///
/// let args = args![10, "ten", [1, 2]];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.to_string(), "(10, \"ten\", [1,2])");
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($arg:tt)+) => {
        $crate::__private::from_array($crate::__private::serde_json::json!([$($arg)+]))
    };
}

#[doc(hidden)]
pub mod __private {
    pub use serde_json;

    use super::{Args, Value};

    /// Unpack the array built by `args!`
    pub fn from_array(value: Value) -> Args {
        match value {
            Value::Array(items) => Args::from(items),
            other => Args::from(vec![other]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_args_macro() {
        let empty = crate::args![];
        assert!(empty.is_empty());

        let x = 7;
        let args = crate::args![x, "a", { "k": true }];
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some(&json!(7)));
        assert_eq!(args.get(2), Some(&json!({ "k": true })));
        assert_eq!(args.get(3), None);
    }

    #[test]
    fn test_args_macro_accepts_expressions() {
        let a = 2;
        let b = 3;
        let v = vec![1, 2, 3, 4];
        let args = crate::args![-5, a + b, v.len(), { "k": -1 }, "s",];
        assert_eq!(args.len(), 5);
        assert_eq!(args.get(0), Some(&json!(-5)));
        assert_eq!(args.get(1), Some(&json!(5)));
        assert_eq!(args.get(2), Some(&json!(4)));
        assert_eq!(args.get(3), Some(&json!({ "k": -1 })));
        assert_eq!(args.get(4), Some(&json!("s")));
    }

    #[test]
    fn test_args_display() {
        let args: Args = vec![json!(1), json!("two")].into();
        assert_eq!(args.to_string(), "(1, \"two\")");
        assert_eq!(Args::new().to_string(), "()");
    }
}
