//! Packet comparator.
//!
//! Pure function of two packets, a field mask and an equality policy.
//! Offsets are relative to the start of the packet, or to the start of the
//! payload when only payloads are compared.

use serde::Serialize;

use crate::options::{Equality, FieldMask};
use crate::packet::{Packet, PID_NULL};

/// Outcome of comparing two packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// The packets are considered the same under the equality policy.
    pub equal: bool,
    /// Number of bytes compared (the shorter of the two regions).
    pub compared_size: usize,
    /// Offset of the first difference, `compared_size` if none.
    pub first_diff: usize,
    /// Offset of the last difference + 1, `compared_size` if none.
    pub end_diff: usize,
    /// Number of differing bytes, may be lower than `end_diff - first_diff`.
    pub diff_count: usize,
}

impl Comparison {
    /// Byte-wise comparison of two regions of possibly different sizes.
    fn of_regions(a: &[u8], b: &[u8], equality: Equality) -> Self {
        let compared_size = a.len().min(b.len());
        let mut first_diff = compared_size;
        let mut end_diff = compared_size;
        let mut diff_count = 0;

        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            if x != y {
                diff_count += 1;
                end_diff = i + 1;
                if first_diff == compared_size {
                    first_diff = i;
                }
            }
        }

        let tolerated = match equality {
            Equality::Strict => 0,
            Equality::Tolerant(threshold) => threshold,
        };

        Self {
            equal: diff_count <= tolerated && a.len() == b.len(),
            compared_size,
            first_diff,
            end_diff,
            diff_count,
        }
    }

    /// Span between first and last difference.
    pub fn diff_span(&self) -> usize {
        self.end_diff.saturating_sub(self.first_diff)
    }
}

/// Compare two packets.
///
/// Null packets are special: two null packets are always equal and a null
/// packet never equals a non-null one, whatever the stuffing content.
pub fn compare(a: &Packet, b: &Packet, mask: &FieldMask, equality: Equality) -> Comparison {
    if a.pid() == PID_NULL || b.pid() == PID_NULL {
        let mut result = Comparison::of_regions(a.as_bytes(), b.as_bytes(), Equality::Strict);
        result.equal = a.pid() == PID_NULL && b.pid() == PID_NULL;
        return result;
    }

    if mask.payload_only {
        return Comparison::of_regions(a.payload(), b.payload(), equality);
    }

    if !mask.masks_fields() {
        return Comparison::of_regions(a.as_bytes(), b.as_bytes(), equality);
    }

    let a = masked(a, mask);
    let b = masked(b, mask);
    Comparison::of_regions(a.as_bytes(), b.as_bytes(), equality)
}

/// Working copy with the ignored fields neutralised.
fn masked(packet: &Packet, mask: &FieldMask) -> Packet {
    let mut copy = *packet;
    if mask.pcr_ignore {
        copy.clear_pcr();
        copy.clear_opcr();
    }
    if mask.pid_ignore {
        copy.set_pid(PID_NULL);
    }
    if mask.cc_ignore {
        copy.set_cc(0);
    }
    copy
}
