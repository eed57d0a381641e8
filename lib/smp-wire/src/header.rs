// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use byteorder::BigEndian;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, U16};

/// Size of the fixed management header in bytes.
pub const HEADER_LEN: usize = 8;

/// Request operation. `READ` fetches state; `WRITE` mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

impl Op {
    fn from_bits(bits: u8) -> Option<Op> {
        match bits {
            0 => Some(Op::Read),
            2 => Some(Op::Write),
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Op::Read => 0,
            Op::Write => 2,
        }
    }
}

/// Recognized management groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Os,
    Image,
    PerUser,
    Other(u16),
}

impl Group {
    const OS: u16 = 0;
    const IMAGE: u16 = 1;
    const PERUSER: u16 = 64;

    fn from_raw(raw: u16) -> Group {
        match raw {
            Self::OS => Group::Os,
            Self::IMAGE => Group::Image,
            Self::PERUSER => Group::PerUser,
            other => Group::Other(other),
        }
    }

    fn raw(self) -> u16 {
        match self {
            Group::Os => Self::OS,
            Group::Image => Self::IMAGE,
            Group::PerUser => Self::PERUSER,
            Group::Other(v) => v,
        }
    }
}

/// On-the-wire layout of the 8-byte SMP header.
///
/// The first byte packs `op:3 | version:2 | reserved:3`; we deliberately
/// read and write those bits with plain masking rather than a `#[bitfield]`
/// macro, since C-style bitfield layout is not something Rust's ABI
/// guarantees across targets.
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct RawHeader {
    op_byte: u8,
    flags: u8,
    length: U16<BigEndian>,
    group: U16<BigEndian>,
    seq: u8,
    id: u8,
}

/// A parsed SMP management header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub op: Op,
    pub flags: u8,
    pub length: u16,
    pub group: Group,
    pub seq: u8,
    pub id: u8,
}

impl Header {
    /// Parses the 8-byte header from `buf`. Returns `None` if `buf` is too
    /// short or the operation field is not `READ`/`WRITE` — callers should
    /// treat either as "drop the datagram silently".
    pub fn parse(buf: &[u8]) -> Option<Header> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let raw = RawHeader::read_from_bytes(&buf[..HEADER_LEN]).ok()?;
        let op = Op::from_bits(raw.op_byte & 0x7)?;
        Some(Header {
            op,
            flags: raw.flags,
            length: raw.length.get(),
            group: Group::from_raw(raw.group.get()),
            seq: raw.seq,
            id: raw.id,
        })
    }

    /// Encodes a reply header for a payload of `payload_len` bytes, into
    /// the first [`HEADER_LEN`] bytes of `out`. The request's `op`,
    /// `flags`, `group`, `seq`, and `id` all round-trip unchanged — the
    /// original only ever rewrites `length` before sending a response
    /// back out of the same buffer the request arrived in.
    pub fn encode_reply(&self, payload_len: u16, out: &mut [u8]) {
        debug_assert!(out.len() >= HEADER_LEN);
        let raw = RawHeader {
            op_byte: self.op.bits(),
            flags: self.flags,
            length: U16::new(payload_len),
            group: U16::new(self.group.raw()),
            seq: self.seq,
            id: self.id,
        };
        out[..HEADER_LEN].copy_from_slice(raw.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes(op: u8, group: u16, seq: u8, id: u8, len: u16) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = op;
        buf[1] = 0;
        buf[2..4].copy_from_slice(&len.to_be_bytes());
        buf[4..6].copy_from_slice(&group.to_be_bytes());
        buf[6] = seq;
        buf[7] = id;
        buf
    }

    #[test]
    fn parses_read_params_header() {
        let buf = sample_bytes(0, 0, 7, 6, 0);
        let hdr = Header::parse(&buf).unwrap();
        assert_eq!(hdr.op, Op::Read);
        assert_eq!(hdr.group, Group::Os);
        assert_eq!(hdr.seq, 7);
        assert_eq!(hdr.id, 6);
        assert_eq!(hdr.length, 0);
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(Header::parse(&[0u8; 4]).is_none());
    }

    #[test]
    fn rejects_unknown_op() {
        let buf = sample_bytes(5, 0, 0, 0, 0);
        assert!(Header::parse(&buf).is_none());
    }

    #[test]
    fn seq_round_trips_on_reply() {
        let buf = sample_bytes(2, 1, 42, 1, 10);
        let hdr = Header::parse(&buf).unwrap();
        let mut out = [0u8; HEADER_LEN];
        hdr.encode_reply(17, &mut out);
        let reply = Header::parse(&out).unwrap();
        assert_eq!(reply.seq, 42);
        assert_eq!(reply.id, 1);
        assert_eq!(reply.length, 17);
        assert_eq!(reply.group, Group::Image);
    }

    #[test]
    fn unknown_group_is_preserved_numerically() {
        let buf = sample_bytes(0, 99, 0, 0, 0);
        let hdr = Header::parse(&buf).unwrap();
        assert_eq!(hdr.group, Group::Other(99));
    }
}
