//! Vocabulary for describing packet layouts.

use either::Either::{self, Left, Right};

use crate::crypto::NONCE_LEN;

/// A fixed-width unsigned integer, in network byte order on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U16,
    U32,
    U64,
}

impl Scalar {
    /// Width on the wire, in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
        }
    }

    /// Whether `value` is representable at this width.
    pub(crate) fn holds(self, value: u64) -> bool {
        match self {
            Self::U64 => true,
            _ => value >> self.bits() == 0,
        }
    }
}

/// The shape of a plain field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    U8,
    U16,
    U32,
    U64,
    /// A fixed-length run of raw bytes.
    Bytes(usize),
}

impl Kind {
    pub(crate) fn bits(self) -> u64 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
            Self::Bytes(len) => (len as u64).saturating_mul(8),
        }
    }
}

/// A bitfield member claiming a record slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packed {
    /// Width the member widens to in the decoded record.
    pub kind: Scalar,
    /// Width on the wire, in bits.
    pub width: u32,
}

/// A bitfield member matched against a constant and discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedLiteral {
    /// The expected value.
    pub value: u64,
    /// Width on the wire, in bits.
    pub width: u32,
}

/// A member of a bitfield group.
pub type Member = Either<Packed, PackedLiteral>;

/// One element of a packet layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// A constant that a packet must carry exactly, claiming no slot.
    Literal(Scalar, u64),
    /// A plain field, claiming the next record slot.
    Field(Kind),
    /// A nonce, claiming a slot and arming the decryption material.
    Nonce,
    /// An authenticated-encrypted section covering the rest of the buffer.
    ///
    /// Must be the final element of its sequence. The inner format decodes
    /// the recovered plaintext, with its slots inlined into the outer record.
    Sealed(Format),
    /// A count prefix followed by that many records, claiming one slot.
    Repeated(Scalar, Format),
    /// Alternative layouts resolved by trial, claiming one slot.
    ///
    /// Alternatives are tried from last declared to first, and the first to
    /// decode without error wins.
    Choice(Vec<Format>),
    /// Sub-byte members packed most significant bit first.
    Bitfield(Vec<Member>),
}

/// An ordered sequence of elements describing one packet layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Format {
    pub(crate) elements: Vec<Element>,
}

impl Format {
    /// Describe a layout from its elements.
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Number of record slots the layout decodes into.
    pub fn slots(&self) -> usize {
        self.elements
            .iter()
            .map(|element| match element {
                Element::Literal(..) => 0,
                Element::Field(_) => 1,
                Element::Nonce => 1,
                Element::Sealed(inner) => inner.slots(),
                Element::Repeated(..) => 1,
                Element::Choice(_) => 1,
                Element::Bitfield(members) => {
                    members.iter().filter(|member| member.is_left()).count()
                }
            })
            .sum()
    }

    /// A lower bound on the bits a matching packet occupies.
    ///
    /// Encrypted sections are counted as empty, as their ciphertext length
    /// depends on the crypto box.
    pub(crate) fn min_bits(&self) -> u64 {
        self.elements
            .iter()
            .map(|element| match element {
                Element::Literal(kind, _) => kind.bits() as u64,
                Element::Field(kind) => kind.bits(),
                Element::Nonce => 8 * NONCE_LEN as u64,
                Element::Sealed(_) => 0,
                Element::Repeated(size, _) => size.bits() as u64,
                Element::Choice(alternatives) => alternatives
                    .iter()
                    .map(Self::min_bits)
                    .min()
                    .unwrap_or_default(),
                Element::Bitfield(members) => members
                    .iter()
                    .map(|member| match member {
                        Left(packed) => packed.width as u64,
                        Right(literal) => literal.width as u64,
                    })
                    .sum(),
            })
            .fold(0, u64::saturating_add)
    }
}
