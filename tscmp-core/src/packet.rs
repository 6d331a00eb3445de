//! MPEG-TS packet access.
//!
//! This module handles 188-byte MPEG Transport Stream packets: header
//! decoding, adaptation field inspection and the field mutators used to
//! neutralise PID, continuity counter, PCR and OPCR before comparison.

/// TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// TS sync byte (0x47).
pub const SYNC_BYTE: u8 = 0x47;

/// Null (stuffing) PID.
pub const PID_NULL: u16 = 0x1FFF;

/// Number of distinct PID values.
pub const PID_MAX: usize = 0x2000;

/// Size of an encoded PCR or OPCR field.
const PCR_BYTES: usize = 6;

/// Parsed TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsHeader {
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// Packet Identifier (13 bits).
    pub pid: u16,
    /// Transport scrambling control (2 bits).
    pub scrambling_control: u8,
    /// Adaptation field control (2 bits).
    pub adaptation_field_control: u8,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl TsHeader {
    /// Check if packet has adaptation field.
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    /// Check if packet has payload.
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }

    /// Check if packet is scrambled.
    pub fn is_scrambled(&self) -> bool {
        self.scrambling_control != 0
    }
}

/// Adaptation field data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// Adaptation field length.
    pub length: u8,
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator.
    pub random_access: bool,
    /// Elementary stream priority indicator.
    pub es_priority: bool,
    /// PCR flag.
    pub pcr_flag: bool,
    /// OPCR flag.
    pub opcr_flag: bool,
    /// Splicing point flag.
    pub splicing_point_flag: bool,
    /// Transport private data flag.
    pub transport_private_data_flag: bool,
    /// Adaptation field extension flag.
    pub adaptation_extension_flag: bool,
    /// PCR value (if present).
    pub pcr: Option<u64>,
    /// OPCR value (if present).
    pub opcr: Option<u64>,
}

/// One transport stream packet, owned and fixed-size.
///
/// Packets are `Copy`: masking for comparison is always done on a copy,
/// the packet read from the source is never altered.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    bytes: [u8; TS_PACKET_SIZE],
}

impl Default for Packet {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("pid", &self.pid())
            .field("cc", &self.cc())
            .finish_non_exhaustive()
    }
}

impl Packet {
    /// A null packet: sync byte, PID 0x1FFF, payload only, 0xFF stuffing.
    pub fn null() -> Self {
        let mut bytes = [0xFFu8; TS_PACKET_SIZE];
        bytes[0] = SYNC_BYTE;
        bytes[1] = 0x1F;
        bytes[2] = 0xFF;
        bytes[3] = 0x10;
        Self { bytes }
    }

    /// Wrap raw packet bytes.
    pub fn from_bytes(bytes: [u8; TS_PACKET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a packet from a slice of at least 188 bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < TS_PACKET_SIZE {
            return Err("Packet too short");
        }
        let mut bytes = [0u8; TS_PACKET_SIZE];
        bytes.copy_from_slice(&data[..TS_PACKET_SIZE]);
        Ok(Self { bytes })
    }

    /// Raw packet bytes.
    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.bytes
    }

    /// Mutable raw packet bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; TS_PACKET_SIZE] {
        &mut self.bytes
    }

    pub fn has_valid_sync(&self) -> bool {
        self.bytes[0] == SYNC_BYTE
    }

    /// Packet Identifier.
    pub fn pid(&self) -> u16 {
        ((self.bytes[1] as u16 & 0x1F) << 8) | self.bytes[2] as u16
    }

    /// Continuity counter.
    pub fn cc(&self) -> u8 {
        self.bytes[3] & 0x0F
    }

    pub fn is_null(&self) -> bool {
        self.pid() == PID_NULL
    }

    /// Decode the 4-byte header.
    pub fn header(&self) -> TsHeader {
        let data = &self.bytes;
        TsHeader {
            transport_error: data[1] & 0x80 != 0,
            payload_unit_start: data[1] & 0x40 != 0,
            transport_priority: data[1] & 0x20 != 0,
            pid: self.pid(),
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_control: (data[3] >> 4) & 0x03,
            continuity_counter: self.cc(),
        }
    }

    fn has_af(&self) -> bool {
        self.bytes[3] & 0x20 != 0
    }

    /// Adaptation field length byte, 0 when there is no adaptation field.
    fn af_length(&self) -> usize {
        if self.has_af() {
            self.bytes[4] as usize
        } else {
            0
        }
    }

    /// Adaptation field flags byte, 0 when absent.
    fn af_flags(&self) -> u8 {
        if self.af_length() > 0 {
            self.bytes[5]
        } else {
            0
        }
    }

    /// Size of the header including the adaptation field.
    pub fn header_size(&self) -> usize {
        if self.has_af() {
            (5 + self.af_length()).min(TS_PACKET_SIZE)
        } else {
            4
        }
    }

    /// Payload bytes, empty when the packet has no payload.
    pub fn payload(&self) -> &[u8] {
        if self.bytes[3] & 0x10 == 0 {
            return &[];
        }
        &self.bytes[self.header_size()..]
    }

    pub fn has_pcr(&self) -> bool {
        self.af_flags() & 0x10 != 0
    }

    pub fn has_opcr(&self) -> bool {
        self.af_flags() & 0x08 != 0
    }

    /// Offset of the PCR in the packet, 0 if there is none.
    pub fn pcr_offset(&self) -> usize {
        if self.has_pcr() && self.af_length() >= 7 {
            6
        } else {
            0
        }
    }

    /// Offset of the OPCR in the packet, 0 if there is none.
    pub fn opcr_offset(&self) -> usize {
        if !self.has_opcr() {
            0
        } else if self.has_pcr() {
            if self.af_length() >= 13 {
                12
            } else {
                0
            }
        } else if self.af_length() >= 7 {
            6
        } else {
            0
        }
    }

    fn clock_at(&self, offset: usize) -> Option<u64> {
        if offset == 0 {
            return None;
        }
        let data = &self.bytes[offset..offset + PCR_BYTES];
        let base = ((data[0] as u64) << 25)
            | ((data[1] as u64) << 17)
            | ((data[2] as u64) << 9)
            | ((data[3] as u64) << 1)
            | ((data[4] as u64) >> 7);
        let ext = ((data[4] as u64 & 0x01) << 8) | data[5] as u64;
        Some(base * 300 + ext)
    }

    /// PCR value in 27 MHz units.
    pub fn pcr(&self) -> Option<u64> {
        self.clock_at(self.pcr_offset())
    }

    /// OPCR value in 27 MHz units.
    pub fn opcr(&self) -> Option<u64> {
        self.clock_at(self.opcr_offset())
    }

    /// Decode the adaptation field, if any.
    pub fn adaptation_field(&self) -> Option<AdaptationField> {
        if !self.has_af() {
            return None;
        }
        let length = self.bytes[4];
        if length == 0 {
            return Some(AdaptationField {
                length,
                ..Default::default()
            });
        }
        let flags = self.bytes[5];
        Some(AdaptationField {
            length,
            discontinuity: flags & 0x80 != 0,
            random_access: flags & 0x40 != 0,
            es_priority: flags & 0x20 != 0,
            pcr_flag: flags & 0x10 != 0,
            opcr_flag: flags & 0x08 != 0,
            splicing_point_flag: flags & 0x04 != 0,
            transport_private_data_flag: flags & 0x02 != 0,
            adaptation_extension_flag: flags & 0x01 != 0,
            pcr: self.pcr(),
            opcr: self.opcr(),
        })
    }

    pub fn set_pid(&mut self, pid: u16) {
        self.bytes[1] = (self.bytes[1] & 0xE0) | ((pid >> 8) as u8 & 0x1F);
        self.bytes[2] = pid as u8;
    }

    pub fn set_cc(&mut self, cc: u8) {
        self.bytes[3] = (self.bytes[3] & 0xF0) | (cc & 0x0F);
    }

    /// Zero the PCR field in place. No-op without PCR.
    pub fn clear_pcr(&mut self) {
        let offset = self.pcr_offset();
        if offset != 0 {
            self.bytes[offset..offset + PCR_BYTES].fill(0);
        }
    }

    /// Zero the OPCR field in place. No-op without OPCR.
    pub fn clear_opcr(&mut self) {
        let offset = self.opcr_offset();
        if offset != 0 {
            self.bytes[offset..offset + PCR_BYTES].fill(0);
        }
    }
}
