//! The recursive decode engine.

use either::Either::{Left, Right};
use thiserror::Error;
use tracing::trace;

use crate::{
    crypto::{Material, NONCE_LEN, Nonce},
    cursor::{Cursor, Domain},
    format::{Element, Format, Kind, Scalar},
    value::{Fields, Value, Variant},
};

/// Errors ending a decode.
///
/// Packets arrive from untrusted peers, so neither case is exceptional; a
/// failed decode means only that this packet does not parse under this
/// layout. Detail useful for diagnosis is traced rather than carried.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The packet's bytes do not match the declared layout.
    #[error("The packet does not match the declared layout.")]
    Format,
    /// An encrypted section was rejected by the crypto box.
    #[error("An encrypted section failed authentication.")]
    Decryption,
}

/// Decode a sequence of elements, appending claimed slots to `record`.
///
/// Returns the cursor advanced past the consumed elements. On an error the
/// caller's cursor is still valid, but `record` may hold slots from a
/// partially decoded prefix.
pub(crate) fn run<'a, D: Domain>(
    elements: &[Element],
    mut material: Material<'_>,
    record: &mut Vec<Value>,
    mut cursor: Cursor<'a, D>,
) -> Result<Cursor<'a, D>, DecodeError> {
    for element in elements {
        cursor = step(element, &mut material, record, cursor)?;
    }

    Ok(cursor)
}

/// Decode one element.
fn step<'a, D: Domain>(
    element: &Element,
    material: &mut Material<'_>,
    record: &mut Vec<Value>,
    cursor: Cursor<'a, D>,
) -> Result<Cursor<'a, D>, DecodeError> {
    match element {
        Element::Literal(kind, expected) => {
            let (found, rest) = read_scalar(*kind, cursor)?;

            if found != *expected {
                trace!(found, expected = *expected, "literal mismatch");
                Err(DecodeError::Format)?;
            }

            Ok(rest)
        }
        Element::Field(kind) => {
            let (value, rest) = read_field(*kind, cursor)?;
            record.push(value);
            Ok(rest)
        }
        Element::Nonce => {
            let (bytes, rest) = cursor.read_array::<NONCE_LEN>()?;
            let nonce = Nonce(bytes);

            record.push(Value::Nonce(nonce));
            material.set_nonce(nonce);

            Ok(rest)
        }
        Element::Sealed(inner) => {
            // The ciphertext is everything left in the buffer; registration
            // guarantees no element follows and that the material is armed.
            let (ciphertext, rest) = cursor.take_rest()?;

            let Some((cbox, nonce)) = material.armed() else {
                return Err(DecodeError::Format);
            };

            let plaintext = match cbox.open(ciphertext, &nonce) {
                Ok(plaintext) => plaintext,
                Err(error) => {
                    trace!(%error, len = ciphertext.len(), "encrypted section rejected");
                    Err(DecodeError::Decryption)?
                }
            };

            // The recovered plaintext is decoded with fresh material, and
            // anything it leaves unconsumed is discarded.
            run(&inner.elements, Material::empty(), record, Cursor::opened(&plaintext))?;

            Ok(rest)
        }
        Element::Repeated(size, inner) => {
            let (count, mut rest) = read_scalar(*size, cursor)?;

            // Cap the reservation by what the remaining buffer could hold.
            let floor = inner.min_bits().max(1);
            let bound = count.min(rest.remaining_bits() as u64 / floor);

            let mut records = Vec::with_capacity(bound as usize);

            for _ in 0..count {
                let mut fields = Vec::with_capacity(inner.slots());
                rest = run(&inner.elements, *material, &mut fields, rest)?;
                records.push(Fields(fields));
            }

            record.push(Value::Records(records));

            Ok(rest)
        }
        Element::Choice(alternatives) => {
            let (variant, rest) = choose(alternatives, *material, cursor)?;
            record.push(Value::Variant(variant));
            Ok(rest)
        }
        Element::Bitfield(members) => {
            let mut cursor = cursor;

            for member in members {
                cursor = match member {
                    Left(packed) => {
                        let (raw, rest) = cursor.read_bits(packed.width)?;
                        record.push(widen(packed.kind, raw));
                        rest
                    }
                    Right(literal) => {
                        let (found, rest) = cursor.read_bits(literal.width)?;

                        if found != literal.value {
                            trace!(found, expected = literal.value, "bitfield literal mismatch");
                            Err(DecodeError::Format)?;
                        }

                        rest
                    }
                };
            }

            Ok(cursor)
        }
    }
}

/// Try alternatives from last declared to first, adopting the first success.
///
/// Each trial starts from the caller's cursor and a copy of its material, so
/// a failed trial leaves no mark on the record or on later trials.
fn choose<'a, D: Domain>(
    alternatives: &[Format],
    material: Material<'_>,
    cursor: Cursor<'a, D>,
) -> Result<(Variant, Cursor<'a, D>), DecodeError> {
    for (alternative, format) in alternatives.iter().enumerate().rev() {
        let mut fields = Vec::with_capacity(format.slots());

        match run(&format.elements, material, &mut fields, cursor) {
            Ok(rest) => {
                trace!(alternative, "choice resolved");
                return Ok((
                    Variant {
                        alternative,
                        fields: Fields(fields),
                    },
                    rest,
                ));
            }
            Err(error) => {
                trace!(alternative, %error, "choice alternative rejected");
            }
        }
    }

    Err(DecodeError::Format)
}

fn read_scalar<'a, D: Domain>(
    kind: Scalar,
    cursor: Cursor<'a, D>,
) -> Result<(u64, Cursor<'a, D>), DecodeError> {
    match kind {
        Scalar::U8 => cursor.read_u8().map(|(x, rest)| (x as u64, rest)),
        Scalar::U16 => cursor.read_u16().map(|(x, rest)| (x as u64, rest)),
        Scalar::U32 => cursor.read_u32().map(|(x, rest)| (x as u64, rest)),
        Scalar::U64 => cursor.read_u64(),
    }
}

fn read_field<'a, D: Domain>(
    kind: Kind,
    cursor: Cursor<'a, D>,
) -> Result<(Value, Cursor<'a, D>), DecodeError> {
    match kind {
        Kind::U8 => cursor.read_u8().map(|(x, rest)| (Value::U8(x), rest)),
        Kind::U16 => cursor.read_u16().map(|(x, rest)| (Value::U16(x), rest)),
        Kind::U32 => cursor.read_u32().map(|(x, rest)| (Value::U32(x), rest)),
        Kind::U64 => cursor.read_u64().map(|(x, rest)| (Value::U64(x), rest)),
        Kind::Bytes(len) => cursor
            .read_bytes(len)
            .map(|(bytes, rest)| (Value::Bytes(bytes.to_vec()), rest)),
    }
}

/// Widen a raw run of bits into the value of its declared kind.
///
/// Registration bounds each member's width by its kind, so the cast is exact.
fn widen(kind: Scalar, raw: u64) -> Value {
    match kind {
        Scalar::U8 => Value::U8(raw as u8),
        Scalar::U16 => Value::U16(raw as u16),
        Scalar::U32 => Value::U32(raw as u32),
        Scalar::U64 => Value::U64(raw),
    }
}
