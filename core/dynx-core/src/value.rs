//! Type coercion — application scalars ↔ canonical wire text
//!
//! 모든 값은 문자열로 엔진에 전달됩니다. 이 모듈이 값이 스토어를 왕복하는
//! 방식의 단일 기준입니다.
//!
//! | Value        | wire text              | column kind  |
//! |--------------|------------------------|--------------|
//! | `Bool`       | `"0"` / `"1"`          | `Bool`       |
//! | `Int`        | decimal                | `Int`        |
//! | `Float`      | fixed-point decimal    | `Float`      |
//! | `Text`       | UTF-8 text             | `LongString` |

use crate::error::{DynxError, DynxResult};
use crate::schema::ColumnType;
use std::fmt;

/// 스토어에 쓸 수 있는 스칼라 값
///
/// 닫힌 열거형이므로 지원하지 않는 타입은 컴파일 타임에 거부됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// 값을 wire 텍스트와 컬럼 타입으로 변환합니다.
    pub fn encode(&self) -> (String, ColumnType) {
        (self.to_wire(), self.kind())
    }

    /// 값이 새 컬럼을 만들 때 사용할 컬럼 타입
    pub fn kind(&self) -> ColumnType {
        match self {
            Value::Bool(_) => ColumnType::Bool,
            Value::Int(_) => ColumnType::Int,
            Value::Float(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::LongString,
        }
    }

    /// Canonical wire text.
    ///
    /// Floats use Rust's shortest round-tripping decimal form, which never
    /// switches to exponent notation.
    pub fn to_wire(&self) -> String {
        match self {
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => v.clone(),
        }
    }

    /// wire 텍스트를 컬럼 타입에 맞는 값으로 복원합니다.
    pub fn decode(text: &str, kind: ColumnType) -> DynxResult<Value> {
        let mismatch = || DynxError::TypeMismatch {
            expected: kind.to_string(),
            actual: text.to_string(),
        };
        match kind {
            ColumnType::Bool => match text {
                "0" => Ok(Value::Bool(false)),
                "1" => Ok(Value::Bool(true)),
                _ => Err(mismatch()),
            },
            ColumnType::Int => text.parse().map(Value::Int).map_err(|_| mismatch()),
            ColumnType::Float => text.parse().map(Value::Float).map_err(|_| mismatch()),
            ColumnType::ShortString | ColumnType::LongString | ColumnType::Hash => {
                Ok(Value::Text(text.to_string()))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

// isize is at most 64 bits on every supported target
impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

/// Unsigned 64-bit widths convert only while they fit the signed column.
macro_rules! impl_try_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl TryFrom<$t> for Value {
                type Error = DynxError;

                fn try_from(v: $t) -> DynxResult<Self> {
                    i64::try_from(v).map(Value::Int).map_err(|_| DynxError::TypeMismatch {
                        expected: "integer within i64".to_string(),
                        actual: format!("{} {v}", stringify!($t)),
                    })
                }
            }
        )*
    };
}

impl_try_from_unsigned!(u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

// raw bytes are stored as text; invalid UTF-8 is replaced
impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Text(String::from_utf8_lossy(v).into_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::from(v.as_slice())
    }
}

/// Builds a `Vec<Value>` from heterogeneous scalars.
///
/// ```rust
/// use dynx_core::{values, Value};
/// let row = values![true, 5, 5.5, "hello"];
/// assert_eq!(row[1], Value::Int(5));
/// ```
#[macro_export]
macro_rules! values {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($v)),+]
    };
}
