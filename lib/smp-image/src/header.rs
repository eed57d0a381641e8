// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::version::ImageVersion;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Magic value at the start of a valid image header.
pub const HEADER_MAGIC: u32 = 0x9635_7464;

/// Set when the image must not be booted on its own (e.g. a combined
/// multi-image bundle header).
const IMAGE_FLAG_NON_BOOTABLE: u32 = 0x0000_0002;

/// Fixed-layout prefix at offset 0 of every image slot.
///
/// Only the fields this core cares about (identity and bootability) are
/// modeled; the remainder of the real header (load address, size, TLV
/// offsets used by the signature verifier) is owned by the image validator
/// and manifest reader, which consume the same bytes independently.
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ImageHeader {
    pub magic: u32,
    pub load_addr: u32,
    pub header_size: u16,
    pub pad1: u16,
    pub image_size: u32,
    pub flags: u32,
    pub version: RawVersion,
    pub pad2: u32,
}

#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build: u32,
}

impl ImageHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn is_magic_valid(&self) -> bool {
        self.magic == HEADER_MAGIC
    }

    pub fn is_bootable(&self) -> bool {
        self.flags & IMAGE_FLAG_NON_BOOTABLE == 0
    }

    pub fn version(&self) -> ImageVersion {
        ImageVersion {
            major: self.version.major,
            minor: self.version.minor,
            revision: self.version.revision,
            build: self.version.build,
        }
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        Self::read_from_bytes(buf).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_bytes() {
        let hdr = ImageHeader {
            magic: HEADER_MAGIC,
            load_addr: 0x0800_0000,
            header_size: 32,
            pad1: 0,
            image_size: 4096,
            flags: 0,
            version: RawVersion {
                major: 1,
                minor: 2,
                revision: 3,
                build: 4,
            },
            pad2: 0,
        };
        let mut buf = [0u8; ImageHeader::SIZE];
        hdr.write_to(&mut buf[..]).unwrap();
        let decoded = ImageHeader::from_bytes(&buf).unwrap();
        assert_eq!(decoded.magic, hdr.magic);
        assert_eq!(decoded.version(), hdr.version());
        assert!(decoded.is_bootable());
    }

    #[test]
    fn non_bootable_flag_is_honored() {
        let mut hdr = ImageHeader {
            magic: HEADER_MAGIC,
            load_addr: 0,
            header_size: 32,
            pad1: 0,
            image_size: 0,
            flags: 0,
            version: RawVersion {
                major: 0,
                minor: 0,
                revision: 0,
                build: 0,
            },
            pad2: 0,
        };
        assert!(hdr.is_bootable());
        hdr.flags |= IMAGE_FLAG_NON_BOOTABLE;
        assert!(!hdr.is_bootable());
    }
}
