//! Packet fixtures shared by the unit tests.

use std::io::Cursor;

use crate::packet::{Packet, SYNC_BYTE, TS_PACKET_SIZE};
use crate::source::PacketReader;

/// Payload packet on `pid` whose content is unique for each `seq`.
pub(crate) fn es_packet(pid: u16, seq: u32) -> Packet {
    let mut data = [0u8; TS_PACKET_SIZE];
    data[0] = SYNC_BYTE;
    data[1] = (pid >> 8) as u8 & 0x1F;
    data[2] = pid as u8;
    data[3] = 0x10 | (seq as u8 & 0x0F);
    data[4..8].copy_from_slice(&seq.to_be_bytes());
    for (i, byte) in data[8..].iter_mut().enumerate() {
        *byte = (i as u32).wrapping_mul(31).wrapping_add(seq) as u8;
    }
    Packet::from_bytes(data)
}

/// In-memory file made of `packets`.
pub(crate) fn reader(packets: &[Packet]) -> PacketReader<Cursor<Vec<u8>>> {
    let mut data = Vec::with_capacity(packets.len() * TS_PACKET_SIZE);
    for packet in packets {
        data.extend_from_slice(packet.as_bytes());
    }
    PacketReader::new(Cursor::new(data), "memory")
}

/// `count` distinct packets spread over two PIDs.
pub(crate) fn stream(count: u32) -> Vec<Packet> {
    (0..count).map(|i| es_packet(0x100 + (i % 2) as u16, i)).collect()
}
