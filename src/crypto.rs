//! The decryption contract and material threaded through a decode.

use thiserror::Error;

/// Length of a nonce, in bytes.
pub const NONCE_LEN: usize = 24;

/// A single-use value combined with a key to open one encrypted section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl From<[u8; NONCE_LEN]> for Nonce {
    fn from(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A ciphertext rejected under the supplied nonce and key.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("The ciphertext failed authentication.")]
pub struct Unauthenticated;

/// An authenticated decryption primitive able to open encrypted sections.
///
/// The decoder never inspects key material; it hands each encrypted
/// section's ciphertext and accumulated nonce to the box and decodes
/// whatever plaintext comes back. Opening must fail for any ciphertext
/// that was not produced under the box's key and the given nonce.
pub trait CryptoBox {
    /// Authenticate and decrypt a ciphertext under a nonce.
    fn open(&self, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>, Unauthenticated>;
}

/// Decryption material accumulated while scanning a layout.
///
/// The box arrives with the packet; the nonce is picked up from a nonce
/// field during the scan. Copies are cheap and independent, so a branch
/// of the decode can extend its own material without disturbing its
/// caller's.
#[derive(Clone, Copy)]
pub(crate) struct Material<'a> {
    cbox: Option<&'a dyn CryptoBox>,
    nonce: Option<Nonce>,
}

impl<'a> Material<'a> {
    /// Material with neither a box nor a nonce.
    pub(crate) fn empty() -> Self {
        Self {
            cbox: None,
            nonce: None,
        }
    }

    /// Material holding a box and awaiting a nonce.
    pub(crate) fn with_box(cbox: &'a dyn CryptoBox) -> Self {
        Self {
            cbox: Some(cbox),
            nonce: None,
        }
    }

    /// Record the nonce decoded from a nonce field.
    pub(crate) fn set_nonce(&mut self, nonce: Nonce) {
        self.nonce = Some(nonce);
    }

    /// The box and nonce together, once both are present.
    pub(crate) fn armed(&self) -> Option<(&'a dyn CryptoBox, Nonce)> {
        match (self.cbox, self.nonce) {
            (Some(cbox), Some(nonce)) => Some((cbox, nonce)),
            _ => None,
        }
    }
}
