#![allow(dead_code)]
#![cfg(feature = "derive")]

use waybill::{
    decode::DecodeError,
    format::{Element, Format, Kind, Scalar},
    layout::{BindError, Layout},
    value::{ExtractError, Fields, FromFields},
};
use zerocopy::TryFromBytes;

#[derive(Debug, FromFields)]
struct NodesResponse {
    #[field(0)]
    sender: [u8; 32],
    #[field(1)]
    nodes: Vec<Node>,
    #[field(2)]
    ping_id: u64,
}

#[derive(Debug, FromFields)]
struct Node {
    #[field(0)]
    address: u32,
    #[field(1)]
    port: u16,
}

fn nodes_response() -> Layout {
    Layout::new(Format::new(vec![
        Element::Literal(Scalar::U8, 0x04),
        Element::Field(Kind::Bytes(32)),
        Element::Repeated(
            Scalar::U8,
            Format::new(vec![
                Element::Field(Kind::U32),
                Element::Field(Kind::U16),
            ]),
        ),
        Element::Field(Kind::U64),
    ]))
    .unwrap()
}

#[test]
fn records_bind_to_derived_structs() {
    let mut packet = vec![0x04];
    packet.extend([0xab; 32]);
    packet.push(0x02);
    packet.extend(0xc0a8_0001u32.to_be_bytes());
    packet.extend(33445u16.to_be_bytes());
    packet.extend(0x7f00_0001u32.to_be_bytes());
    packet.extend(33446u16.to_be_bytes());
    packet.extend(0x1122_3344_5566_7788u64.to_be_bytes());

    let response = nodes_response()
        .decode_as(&packet, |response: NodesResponse| response)
        .unwrap();

    assert_eq!(response.sender, [0xab; 32]);
    assert_eq!(response.nodes.len(), 2);
    assert_eq!(response.nodes[0].address, 0xc0a8_0001);
    assert_eq!(response.nodes[0].port, 33445);
    assert_eq!(response.nodes[1].address, 0x7f00_0001);
    assert_eq!(response.nodes[1].port, 33446);
    assert_eq!(response.ping_id, 0x1122_3344_5566_7788);
}

#[test]
fn decode_failures_pass_through_typed_binding() {
    let result = nodes_response().decode_as(&[0x05], |response: NodesResponse| response);

    assert_eq!(result.unwrap_err(), BindError::Decode(DecodeError::Format));
}

#[derive(Debug, FromFields)]
struct Probe {
    #[field(0)]
    id: u8,
    seen: bool,
}

#[test]
fn unattributed_fields_fill_from_default() {
    let layout = Layout::new(Format::new(vec![Element::Field(Kind::U8)])).unwrap();

    let probe = layout.decode_as(&[0x41], |probe: Probe| probe).unwrap();

    assert_eq!(probe.id, 0x41);
    assert!(!probe.seen);
}

#[test]
fn kind_mismatches_surface_as_bind_errors() {
    let layout = Layout::new(Format::new(vec![Element::Field(Kind::U16)])).unwrap();

    let result = layout.decode_as(&[0x00, 0x07], |probe: Probe| probe);

    assert_eq!(
        result.unwrap_err(),
        BindError::Extract(ExtractError::Mismatch(0))
    );
}

#[derive(Debug, FromFields)]
struct Beyond {
    #[field(5)]
    missing: u8,
}

#[test]
fn out_of_range_slots_surface_as_bind_errors() {
    let layout = Layout::new(Format::new(vec![Element::Field(Kind::U8)])).unwrap();

    let result = layout.decode_as(&[0x00], |beyond: Beyond| beyond);

    assert_eq!(
        result.unwrap_err(),
        BindError::Extract(ExtractError::Missing(5))
    );
}

#[derive(Debug, FromFields)]
struct Header {
    #[field(0)]
    kind: u8,
    #[field(1)]
    sequence: u16,
}

#[repr(u8)]
#[derive(Debug, PartialEq, TryFromBytes)]
enum PacketKind {
    Ping = 0x00,
    Pong = 0x01,
    Data = 0x12,
}

impl Header {
    fn kind(&self) -> Option<PacketKind> {
        zerocopy::try_transmute!(self.kind).ok()
    }
}

#[test]
fn raw_kinds_convert_through_accessors() {
    let layout = Layout::new(Format::new(vec![
        Element::Field(Kind::U8),
        Element::Field(Kind::U16),
    ]))
    .unwrap();

    let header = layout
        .decode_as(&[0x01, 0x00, 0x2a], |header: Header| header)
        .unwrap();

    assert_eq!(header.kind(), Some(PacketKind::Pong));
    assert_eq!(header.sequence, 42);

    let header = layout
        .decode_as(&[0x99, 0x00, 0x2a], |header: Header| header)
        .unwrap();

    assert_eq!(header.kind(), None);
}
