//! Registration and the decode entry points.
//!
//! A [`Format`] says nothing about whether its encrypted sections line up
//! with the crypto arguments a caller will supply. Registration closes that
//! gap: constructing a [`Layout`] or [`SealedLayout`] walks the format once
//! and rejects any description whose shape cannot decode, so a registered
//! layout never needs to re-ask at decode time.

use either::Either::{Left, Right};
use thiserror::Error;

use crate::{
    crypto::{CryptoBox, Material},
    cursor::Cursor,
    decode::{DecodeError, run},
    format::{Element, Format},
    value::{ExtractError, Fields, FromFields},
};

/// Errors rejecting a format at registration.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// An encrypted section appears where no crypto box is available.
    #[error("An encrypted section appears where no crypto box is available.")]
    MissingBox,
    /// An encrypted section is not preceded by a nonce field.
    #[error("An encrypted section is not preceded by a nonce field.")]
    MissingNonce,
    /// An encrypted section is preceded by more than one nonce field.
    #[error("An encrypted section is preceded by more than one nonce field.")]
    ExtraNonce,
    /// An element follows an encrypted section.
    #[error("An element follows an encrypted section.")]
    TrailingElement,
    /// The layout never reaches an encrypted section.
    #[error("The layout never reaches an encrypted section.")]
    UnusedBox,
    /// A literal's value does not fit its declared width.
    #[error("A literal's value does not fit its declared width.")]
    OversizedLiteral,
    /// A bitfield member's width is zero or too wide for its kind.
    #[error("A bitfield member's width is zero or too wide for its kind.")]
    MemberWidth,
    /// A choice element has no alternatives.
    #[error("A choice element has no alternatives.")]
    EmptyChoice,
    /// A bitfield group has no members.
    #[error("A bitfield group has no members.")]
    EmptyBitfield,
    /// A repeated element's record may match zero bits.
    #[error("A repeated element's record may match zero bits.")]
    EmptyRecord,
}

/// Errors from the typed decode entry points.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BindError {
    /// The packet failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The record did not bind to the requested type.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// A registered layout that never decrypts.
#[derive(Clone, Debug)]
pub struct Layout {
    format: Format,
    slots: usize,
}

impl Layout {
    /// Validate and register a format taking no crypto arguments.
    ///
    /// Any encrypted section in the format is rejected here, as no box will
    /// be available to open it.
    pub fn new(format: Format) -> Result<Self, LayoutError> {
        let mut sealed = false;
        check(
            &format.elements,
            Shape {
                boxed: false,
                nonces: 0,
            },
            &mut sealed,
        )?;

        let slots = format.slots();

        Ok(Self { format, slots })
    }

    /// Decode a packet, invoking `handler` with its record.
    ///
    /// The handler runs only once the whole packet has decoded; a failure
    /// anywhere leaves it uninvoked.
    pub fn decode<R>(
        &self,
        packet: &[u8],
        handler: impl FnOnce(Fields) -> R,
    ) -> Result<R, DecodeError> {
        let mut record = Vec::with_capacity(self.slots);
        run(&self.format.elements, Material::empty(), &mut record, Cursor::wire(packet))?;

        Ok(handler(Fields(record)))
    }

    /// Decode a packet into a typed message, invoking `handler` with it.
    pub fn decode_as<T: FromFields, R>(
        &self,
        packet: &[u8],
        handler: impl FnOnce(T) -> R,
    ) -> Result<R, BindError> {
        let message = self.decode(packet, |fields| T::from_fields(&fields))?;

        Ok(handler(message?))
    }
}

/// A registered layout that decrypts with a caller-supplied box.
#[derive(Clone, Debug)]
pub struct SealedLayout {
    format: Format,
    slots: usize,
}

impl SealedLayout {
    /// Validate and register a format requiring a crypto box.
    ///
    /// The format must reach an encrypted section on some path, each
    /// encrypted section must close out its sequence, and exactly one nonce
    /// field must precede it.
    pub fn new(format: Format) -> Result<Self, LayoutError> {
        let mut sealed = false;
        check(
            &format.elements,
            Shape {
                boxed: true,
                nonces: 0,
            },
            &mut sealed,
        )?;

        if !sealed {
            Err(LayoutError::UnusedBox)?;
        }

        let slots = format.slots();

        Ok(Self { format, slots })
    }

    /// Decode a packet with a crypto box, invoking `handler` with its record.
    ///
    /// The handler runs only once the whole packet has decoded; a failure
    /// anywhere, including a rejected ciphertext, leaves it uninvoked.
    pub fn decode<R>(
        &self,
        packet: &[u8],
        cbox: &dyn CryptoBox,
        handler: impl FnOnce(Fields) -> R,
    ) -> Result<R, DecodeError> {
        let mut record = Vec::with_capacity(self.slots);
        run(&self.format.elements, Material::with_box(cbox), &mut record, Cursor::wire(packet))?;

        Ok(handler(Fields(record)))
    }

    /// Decode a packet into a typed message, invoking `handler` with it.
    pub fn decode_as<T: FromFields, R>(
        &self,
        packet: &[u8],
        cbox: &dyn CryptoBox,
        handler: impl FnOnce(T) -> R,
    ) -> Result<R, BindError> {
        let message = self.decode(packet, cbox, |fields| T::from_fields(&fields))?;

        Ok(handler(message?))
    }
}

/// Crypto material available at a point in a layout, tracked symbolically.
#[derive(Clone, Copy)]
struct Shape {
    boxed: bool,
    nonces: u32,
}

/// Walk a sequence of elements, rejecting shapes that cannot decode.
///
/// `shape` mirrors the material the engine will hold at each element, so
/// every rule checked here is one the engine can then take for granted.
fn check(elements: &[Element], mut shape: Shape, sealed: &mut bool) -> Result<(), LayoutError> {
    for (index, element) in elements.iter().enumerate() {
        match element {
            Element::Literal(kind, value) => {
                if !kind.holds(*value) {
                    Err(LayoutError::OversizedLiteral)?;
                }
            }
            Element::Field(_) => {}
            Element::Nonce => shape.nonces += 1,
            Element::Sealed(inner) => {
                if index + 1 != elements.len() {
                    Err(LayoutError::TrailingElement)?;
                }

                if !shape.boxed {
                    Err(LayoutError::MissingBox)?;
                }

                match shape.nonces {
                    0 => Err(LayoutError::MissingNonce)?,
                    1 => {}
                    _ => Err(LayoutError::ExtraNonce)?,
                }

                *sealed = true;

                // The section's interior decodes with fresh material, so a
                // nested section has no box to draw on.
                check(
                    &inner.elements,
                    Shape {
                        boxed: false,
                        nonces: 0,
                    },
                    sealed,
                )?;
            }
            Element::Repeated(_, inner) => {
                if inner.min_bits() == 0 {
                    Err(LayoutError::EmptyRecord)?;
                }

                check(&inner.elements, shape, sealed)?;
            }
            Element::Choice(alternatives) => {
                if alternatives.is_empty() {
                    Err(LayoutError::EmptyChoice)?;
                }

                for alternative in alternatives {
                    check(&alternative.elements, shape, sealed)?;
                }
            }
            Element::Bitfield(members) => {
                if members.is_empty() {
                    Err(LayoutError::EmptyBitfield)?;
                }

                for member in members {
                    match member {
                        Left(packed) => {
                            if packed.width == 0 || packed.width > packed.kind.bits() {
                                Err(LayoutError::MemberWidth)?;
                            }
                        }
                        Right(literal) => {
                            if literal.width == 0 || literal.width > 64 {
                                Err(LayoutError::MemberWidth)?;
                            }

                            if literal.width < 64 && literal.value >> literal.width != 0 {
                                Err(LayoutError::OversizedLiteral)?;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
