use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use waybill::{
    crypto::{CryptoBox, Nonce, Unauthenticated},
    decode::DecodeError,
    format::{Element, Format, Kind, Scalar},
    layout::{Layout, LayoutError, SealedLayout},
    value::Variant,
};

/// An XChaCha20-Poly1305 box under a fixed key.
struct TestBox(XChaCha20Poly1305);

impl TestBox {
    fn new(key: &[u8; 32]) -> Self {
        Self(XChaCha20Poly1305::new_from_slice(key).unwrap())
    }

    fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Vec<u8> {
        self.0
            .encrypt(XNonce::from_slice(nonce.as_ref()), plaintext)
            .unwrap()
    }
}

impl CryptoBox for TestBox {
    fn open(&self, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>, Unauthenticated> {
        self.0
            .decrypt(XNonce::from_slice(nonce.as_ref()), ciphertext)
            .map_err(|_| Unauthenticated)
    }
}

fn sealed_u32() -> SealedLayout {
    SealedLayout::new(Format::new(vec![
        Element::Nonce,
        Element::Sealed(Format::new(vec![Element::Field(Kind::U32)])),
    ]))
    .unwrap()
}

#[test]
fn sealed_sections_decrypt_and_decode() {
    let layout = sealed_u32();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce::from([0x24; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &7u32.to_be_bytes()));

    let fields = layout.decode(&packet, &cbox, |fields| fields).unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get::<Nonce>(0), Ok(nonce));
    assert_eq!(fields.get::<u32>(1), Ok(7));
}

#[test]
fn wrong_keys_are_rejected() {
    let layout = sealed_u32();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce([0x24; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &7u32.to_be_bytes()));

    let wrong = TestBox::new(&[0x22; 32]);

    assert_eq!(
        layout.decode(&packet, &wrong, |_| ()),
        Err(DecodeError::Decryption)
    );
}

#[test]
fn tampered_ciphertexts_are_rejected() {
    let layout = sealed_u32();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce([0x24; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &7u32.to_be_bytes()));
    *packet.last_mut().unwrap() ^= 0x01;

    let mut invoked = false;
    let result = layout.decode(&packet, &cbox, |_| invoked = true);

    assert_eq!(result, Err(DecodeError::Decryption));
    assert!(!invoked);
}

#[test]
fn the_nonce_is_read_from_the_packet() {
    let layout = sealed_u32();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce([0x24; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &7u32.to_be_bytes()));

    // Corrupting the transported nonce changes what the box opens with.
    packet[0] ^= 0x01;

    assert_eq!(
        layout.decode(&packet, &cbox, |_| ()),
        Err(DecodeError::Decryption)
    );
}

#[test]
fn plaintext_leftovers_are_discarded() {
    let layout = SealedLayout::new(Format::new(vec![
        Element::Nonce,
        Element::Sealed(Format::new(vec![Element::Field(Kind::U8)])),
    ]))
    .unwrap();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce([0x42; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &[0x09, 0xff, 0xff]));

    let fields = layout.decode(&packet, &cbox, |fields| fields).unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get::<u8>(1), Ok(9));
}

#[test]
fn inner_format_errors_propagate() {
    let layout = SealedLayout::new(Format::new(vec![
        Element::Nonce,
        Element::Sealed(Format::new(vec![Element::Literal(Scalar::U8, 0x42)])),
    ]))
    .unwrap();

    let cbox = TestBox::new(&[0x11; 32]);
    let nonce = Nonce([0x42; 24]);

    let mut packet = nonce.0.to_vec();
    packet.extend(cbox.seal(&nonce, &[0x43]));

    assert_eq!(
        layout.decode(&packet, &cbox, |_| ()),
        Err(DecodeError::Format)
    );
}

#[test]
fn material_reaches_sealed_sections_inside_choices() {
    let layout = SealedLayout::new(Format::new(vec![Element::Choice(vec![
        Format::new(vec![Element::Literal(Scalar::U8, 0x00)]),
        Format::new(vec![
            Element::Literal(Scalar::U8, 0x01),
            Element::Nonce,
            Element::Sealed(Format::new(vec![Element::Field(Kind::U16)])),
        ]),
    ])]))
    .unwrap();

    let cbox = TestBox::new(&[0x33; 32]);
    let nonce = Nonce([0x07; 24]);

    let mut packet = vec![0x01];
    packet.extend(nonce.0);
    packet.extend(cbox.seal(&nonce, &0x0506u16.to_be_bytes()));

    let fields = layout.decode(&packet, &cbox, |fields| fields).unwrap();
    let variant = fields.get::<Variant>(0).unwrap();

    assert_eq!(variant.alternative, 1);
    assert_eq!(variant.fields.get::<u16>(1), Ok(0x0506));

    // The plain alternative still decodes without touching the box.
    let fields = layout.decode(&[0x00], &cbox, |fields| fields).unwrap();
    assert_eq!(fields.get::<Variant>(0).unwrap().alternative, 0);
}

#[test]
fn registration_enforces_crypto_shape() {
    // A plaintext layout has no box for a sealed section to draw on.
    assert_eq!(
        Layout::new(Format::new(vec![
            Element::Nonce,
            Element::Sealed(Format::new(vec![Element::Field(Kind::U8)])),
        ]))
        .unwrap_err(),
        LayoutError::MissingBox
    );

    assert_eq!(
        SealedLayout::new(Format::new(vec![Element::Sealed(Format::new(vec![
            Element::Field(Kind::U8),
        ]))]))
        .unwrap_err(),
        LayoutError::MissingNonce
    );

    assert_eq!(
        SealedLayout::new(Format::new(vec![
            Element::Nonce,
            Element::Nonce,
            Element::Sealed(Format::new(vec![Element::Field(Kind::U8)])),
        ]))
        .unwrap_err(),
        LayoutError::ExtraNonce
    );

    assert_eq!(
        SealedLayout::new(Format::new(vec![
            Element::Nonce,
            Element::Sealed(Format::new(vec![Element::Field(Kind::U8)])),
            Element::Field(Kind::U8),
        ]))
        .unwrap_err(),
        LayoutError::TrailingElement
    );

    assert_eq!(
        SealedLayout::new(Format::new(vec![Element::Field(Kind::U8)])).unwrap_err(),
        LayoutError::UnusedBox
    );

    // A nested section would decode with fresh material, which holds no box.
    assert_eq!(
        SealedLayout::new(Format::new(vec![
            Element::Nonce,
            Element::Sealed(Format::new(vec![
                Element::Nonce,
                Element::Sealed(Format::new(vec![Element::Field(Kind::U8)])),
            ])),
        ]))
        .unwrap_err(),
        LayoutError::MissingBox
    );
}
