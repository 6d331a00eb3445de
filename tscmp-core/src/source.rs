//! Sequential packet sources.

use std::io::{ErrorKind, Read};

use log::{debug, warn};

use crate::packet::{Packet, TS_PACKET_SIZE};

/// Sequential supplier of packets.
pub trait PacketSource {
    /// Fill `buf` from the front and return the number of packets stored.
    ///
    /// A count lower than `buf.len()` means the source is exhausted, either
    /// at its end or because of an error; both are treated alike.
    fn read_packets(&mut self, buf: &mut [Packet]) -> usize;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn read_packets(&mut self, buf: &mut [Packet]) -> usize {
        (**self).read_packets(buf)
    }
}

/// Reads 188-byte packets from any byte stream.
pub struct PacketReader<R> {
    inner: R,
    name: String,
    packets_read: u64,
    done: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            packets_read: 0,
            done: false,
        }
    }

    /// Name used in log messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of packets delivered so far.
    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read as many bytes as possible into `buf`, up to its length.
    fn read_full(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn read_one(&mut self) -> Option<Packet> {
        let mut data = [0u8; TS_PACKET_SIZE];
        match self.read_full(&mut data) {
            Ok(TS_PACKET_SIZE) => {}
            Ok(0) => {
                debug!("{}: end of file after {} packets", self.name, self.packets_read);
                return None;
            }
            Ok(n) => {
                warn!(
                    "{}: ignoring truncated packet of {} bytes after {} packets",
                    self.name, n, self.packets_read
                );
                return None;
            }
            Err(e) => {
                warn!("{}: read error after {} packets: {}", self.name, self.packets_read, e);
                return None;
            }
        }

        let packet = Packet::from_bytes(data);
        if !packet.has_valid_sync() {
            warn!(
                "{}: synchronization lost at packet {}, got 0x{:02X} instead of sync byte",
                self.name,
                self.packets_read,
                data[0]
            );
            return None;
        }
        Some(packet)
    }
}

impl<R: Read> PacketSource for PacketReader<R> {
    fn read_packets(&mut self, buf: &mut [Packet]) -> usize {
        if self.done {
            return 0;
        }
        for (count, slot) in buf.iter_mut().enumerate() {
            match self.read_one() {
                Some(packet) => {
                    *slot = packet;
                    self.packets_read += 1;
                }
                None => {
                    self.done = true;
                    return count;
                }
            }
        }
        buf.len()
    }
}
