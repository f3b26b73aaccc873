//! A bit-addressable cursor over a packet buffer.

use core::marker::PhantomData;

use zerocopy::{
    FromBytes,
    byteorder::big_endian::{U16, U32, U64},
};

use crate::decode::DecodeError;

/// Marker for bytes as received from the wire.
#[derive(Clone, Copy, Debug)]
pub struct Wire;

/// Marker for bytes recovered by opening an encrypted section.
#[derive(Clone, Copy, Debug)]
pub struct Opened;

/// Domains a cursor distinguishes.
///
/// Cursors over the two domains never mix: a position in recovered plaintext
/// cannot be carried back into the enclosing ciphertext, nor the reverse.
pub trait Domain: sealed::Sealed {}

impl Domain for Wire {}
impl Domain for Opened {}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Wire {}
    impl Sealed for super::Opened {}
}

/// A read position into a buffer of domain `D`, in bits.
///
/// Reads consume the cursor and return the value alongside a successor
/// positioned past it. Cursors are `Copy`, so a caller holding one may retry
/// from the same position after a failed read.
pub struct Cursor<'a, D> {
    buf: &'a [u8],
    bit: usize,
    _domain: PhantomData<D>,
}

impl<D> Clone for Cursor<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Cursor<'_, D> {}

impl<'a> Cursor<'a, Wire> {
    /// View a received packet from its first bit.
    pub fn wire(buf: &'a [u8]) -> Self {
        Self {
            buf,
            bit: 0,
            _domain: PhantomData,
        }
    }
}

impl<'a> Cursor<'a, Opened> {
    /// View recovered plaintext from its first bit.
    pub(crate) fn opened(buf: &'a [u8]) -> Self {
        Self {
            buf,
            bit: 0,
            _domain: PhantomData,
        }
    }
}

impl<'a, D: Domain> Cursor<'a, D> {
    /// Bits left to read.
    pub fn remaining_bits(&self) -> usize {
        8 * self.buf.len() - self.bit
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit % 8 == 0
    }

    fn skip(self, bits: usize) -> Self {
        Self {
            bit: self.bit + bits,
            ..self
        }
    }

    /// Read `width` bits as an unsigned integer, most significant bit first.
    ///
    /// `width` must be between 1 and 64.
    pub fn read_bits(self, width: u32) -> Result<(u64, Self), DecodeError> {
        debug_assert!((1..=64).contains(&width));

        if self.remaining_bits() < width as usize {
            Err(DecodeError::Format)?;
        }

        let mut value = 0;

        for bit in self.bit..self.bit + width as usize {
            let byte = self.buf[bit / 8];
            value = value << 1 | (byte >> (7 - bit % 8) & 1) as u64;
        }

        Ok((value, self.skip(width as usize)))
    }

    /// Read a `u8`.
    pub fn read_u8(self) -> Result<(u8, Self), DecodeError> {
        let (value, successor) = self.read_bits(8)?;
        Ok((value as u8, successor))
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(self) -> Result<(u16, Self), DecodeError> {
        if self.is_aligned() {
            let (raw, _) = U16::read_from_prefix(&self.buf[self.bit / 8..])
                .map_err(|_| DecodeError::Format)?;
            Ok((raw.get(), self.skip(16)))
        } else {
            let (value, successor) = self.read_bits(16)?;
            Ok((value as u16, successor))
        }
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(self) -> Result<(u32, Self), DecodeError> {
        if self.is_aligned() {
            let (raw, _) = U32::read_from_prefix(&self.buf[self.bit / 8..])
                .map_err(|_| DecodeError::Format)?;
            Ok((raw.get(), self.skip(32)))
        } else {
            let (value, successor) = self.read_bits(32)?;
            Ok((value as u32, successor))
        }
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(self) -> Result<(u64, Self), DecodeError> {
        if self.is_aligned() {
            let (raw, _) = U64::read_from_prefix(&self.buf[self.bit / 8..])
                .map_err(|_| DecodeError::Format)?;
            Ok((raw.get(), self.skip(64)))
        } else {
            self.read_bits(64)
        }
    }

    /// Read a fixed-length array of bytes.
    ///
    /// The cursor must sit on a byte boundary.
    pub fn read_array<const N: usize>(self) -> Result<([u8; N], Self), DecodeError> {
        if !self.is_aligned() {
            Err(DecodeError::Format)?;
        }

        let (array, _) = <[u8; N]>::read_from_prefix(&self.buf[self.bit / 8..])
            .map_err(|_| DecodeError::Format)?;

        Ok((array, self.skip(8 * N)))
    }

    /// Read an exact-length run of bytes.
    ///
    /// The cursor must sit on a byte boundary.
    pub fn read_bytes(self, len: usize) -> Result<(&'a [u8], Self), DecodeError> {
        if !self.is_aligned() {
            Err(DecodeError::Format)?;
        }

        let start = self.bit / 8;
        let end = start.checked_add(len).ok_or(DecodeError::Format)?;
        let bytes = self.buf.get(start..end).ok_or(DecodeError::Format)?;

        Ok((bytes, self.skip(8 * len)))
    }

    /// Take every remaining byte, leaving the cursor at the end of the buffer.
    ///
    /// The cursor must sit on a byte boundary.
    pub fn take_rest(self) -> Result<(&'a [u8], Self), DecodeError> {
        if !self.is_aligned() {
            Err(DecodeError::Format)?;
        }

        let bytes = &self.buf[self.bit / 8..];

        Ok((bytes, self.skip(8 * bytes.len())))
    }
}
