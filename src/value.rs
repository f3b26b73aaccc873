//! Decoded records and typed extraction.

use thiserror::Error;

use crate::crypto::Nonce;

/// One decoded slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// A fixed-length byte field.
    Bytes(Vec<u8>),
    /// A nonce field.
    Nonce(Nonce),
    /// The records of a repeated element.
    Records(Vec<Fields>),
    /// The winning alternative of a choice element.
    Variant(Variant),
}

/// The outcome of a choice element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Declaration index of the alternative that matched.
    pub alternative: usize,
    /// The alternative's decoded record.
    pub fields: Fields,
}

/// The decoded record of one packet: a value for each slot-claiming element,
/// in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fields(pub(crate) Vec<Value>);

impl Fields {
    /// Number of slots in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow a slot.
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Extract a slot as a concrete type.
    pub fn get<T: FieldValue>(&self, index: usize) -> Result<T, ExtractError> {
        let value = self.0.get(index).ok_or(ExtractError::Missing(index))?;
        T::from_value(value).ok_or(ExtractError::Mismatch(index))
    }
}

/// Errors extracting typed values from a record.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The record has no such slot.
    #[error("The record has no slot {0}.")]
    Missing(usize),
    /// The slot holds a different kind of value.
    #[error("Slot {0} holds a different kind of value.")]
    Mismatch(usize),
}

/// Types extractable from a record slot.
pub trait FieldValue: Sized {
    /// Extract from a slot, if it holds a value of this type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FieldValue for u8 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U8(x) => Some(*x),
            _ => None,
        }
    }
}

impl FieldValue for u16 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U16(x) => Some(*x),
            _ => None,
        }
    }
}

impl FieldValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U32(x) => Some(*x),
            _ => None,
        }
    }
}

impl FieldValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }
}

impl<const N: usize> FieldValue for [u8; N] {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(bytes) => bytes.as_slice().try_into().ok(),
            _ => None,
        }
    }
}

impl FieldValue for Nonce {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Nonce(nonce) => Some(*nonce),
            _ => None,
        }
    }
}

impl FieldValue for Variant {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Variant(variant) => Some(variant.clone()),
            _ => None,
        }
    }
}

impl<T: FromFields> FieldValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Records(records) => records
                .iter()
                .map(|fields| T::from_fields(fields).ok())
                .collect(),
            _ => None,
        }
    }
}

/// Derive [`FromFields`] for a struct representing a decoded message.
///
/// _Requires Cargo feature `derive`._
///
/// # Example
///
/// Add the `field(N)` attribute to each struct field, where `N` is the record
/// slot to extract and the field's type implements [`FieldValue`]. Fields
/// without an attribute are filled from [`Default`]. Records of a repeated
/// element bind to a `Vec<T>` where `T` itself derives `FromFields`.
///
/// ```
/// #[derive(Debug, FromFields)]
/// struct NodesResponse {
///     #[field(0)]
///     public_key: [u8; 32],
///     #[field(1)]
///     nodes: Vec<NodeInfo>,
///     #[field(2)]
///     ping_id: u64,
/// }
/// ```
#[cfg(feature = "derive")]
pub use waybill_derive::FromFields;

/// Build a typed message from a decoded record.
///
/// See the [`FromFields`](macro@FromFields) derive macro for an automatic
/// implementation of this trait.
pub trait FromFields: Sized {
    /// Bind the record's slots, in declaration order.
    fn from_fields(fields: &Fields) -> Result<Self, ExtractError>;
}
