//! Engine types — cursor modes and index keys

use crate::value::Value;

/// 커서 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// one read or mutation, then the cursor closes itself
    Single,
    /// mutations are pipelined until `commit`
    Batch,
}

/// 커서 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// holds a pooled connection
    Active,
    /// connection returned; every operation panics
    Closed,
}

/// Index key of a write: one value per index column.
///
/// Scalars convert into a one-column key, tuples and vectors into composite
/// keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

macro_rules! impl_key_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(v: $t) -> Self {
                    Key(vec![Value::from(v)])
                }
            }
        )*
    };
}

impl_key_from_scalar!(
    bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, &str, String, &String
);

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key(vec![v])
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Key(values)
    }
}

impl From<&[Value]> for Key {
    fn from(values: &[Value]) -> Self {
        Key(values.to_vec())
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key(vec![a.into(), b.into(), c.into()])
    }
}
