//! A declarative decoder for encrypted peer-to-peer packet formats.
//!
//! Waybill describes binary packet layouts as data. A [`format::Format`]
//! lists the elements a packet carries, from plain fields and literals down
//! to sub-byte bitfield members, and the decoder walks that description
//! against the raw bytes. Layouts may declare authenticated-encrypted
//! sections, with the nonce picked up from the packet itself; the decoder
//! threads the decryption material through the walk and hands each section's
//! ciphertext to a caller-supplied [`crypto::CryptoBox`].
//!
//! Formats are validated once, at registration, by [`layout::Layout`] (for
//! plaintext layouts) and [`layout::SealedLayout`] (for layouts that
//! decrypt). A registered layout decodes a packet into a flat record of
//! [`value::Value`] slots and invokes a handler with the result, or binds
//! the record to a struct deriving [`value::FromFields`].
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: enable derive macros (default).

pub mod crypto;
pub mod cursor;
pub mod decode;
pub mod format;
pub mod layout;
pub mod value;
