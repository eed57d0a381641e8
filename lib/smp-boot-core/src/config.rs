// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Compile-time geometry and protocol limits a board crate supplies.
///
/// Nothing in `smp-boot-core` hardcodes a device; every constant a handler
/// needs to size a buffer or bound a loop comes from here, the way the
/// teacher's board-support crates feed a `const` device map into a generic
/// driver rather than the driver assuming a particular part number.
pub trait BootConfig {
    /// Number of distinct images managed (each with a primary + secondary
    /// slot). Almost always `1` or `2`.
    const NUM_IMAGES: u8;

    /// Digest size of the configured hash algorithm, in bytes (32, 48, or
    /// 64 for SHA-256/384/512).
    const HASH_SIZE: usize;

    /// Largest datagram this protocol will accept.
    const MAX_DATAGRAM: usize = 2048;

    /// Largest response payload (CBOR body, header excluded) this protocol
    /// will emit.
    const MAX_RESPONSE: usize = 1024;

    /// Flash write/read alignment unit, in bytes.
    const ALIGN: u32 = 4;

    /// Erase granularity, in bytes. Every configured area's size must be a
    /// multiple of this.
    const SECTOR_SIZE: u32;

    /// UDP port the dispatch loop binds to.
    const UDP_PORT: u16;

    /// CBOR TLV type identifying the image hash entry in a manifest
    /// trailer.
    const HASH_TLV_TYPE: u16 = 0x10;
}
