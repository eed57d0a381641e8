// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{ALIGN, ERASED_VALUE};

/// Identifies a flash area by role rather than by raw integer id.
///
/// `Primary`/`Secondary` carry the image index they belong to, so a
/// multi-image board can register one pair of areas per image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AreaKind {
    Bootloader,
    Primary(u8),
    Secondary(u8),
    Scratch,
}

/// An immutable `(device, base_offset, size)` record for one flash area.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlashArea {
    pub device_id: u8,
    pub base_offset: u32,
    pub size: u32,
}

impl FlashArea {
    pub const fn new(device_id: u8, base_offset: u32, size: u32) -> Self {
        Self {
            device_id,
            base_offset,
            size,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        ALIGN
    }

    pub fn erased_value(&self) -> u8 {
        ERASED_VALUE
    }
}

/// One erase-granularity slice of a [`FlashArea`], expressed relative to the
/// area's own base offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlashSector {
    pub offset_in_area: u32,
    pub size: u32,
}

/// Tiles a [`FlashArea`] into fixed-size sectors.
///
/// Area sizes are expected to be exact multiples of the sector size; in a
/// misconfigured build the final sector would be silently truncated, which
/// the original implementation this is ported from treats as unreachable
/// (a configuration bug, not a runtime condition to recover from).
pub struct Sectors {
    pub(crate) area_size: u32,
    pub(crate) sector_size: u32,
    pub(crate) pos: u32,
}

impl Iterator for Sectors {
    type Item = FlashSector;

    fn next(&mut self) -> Option<FlashSector> {
        if self.pos >= self.area_size {
            return None;
        }
        debug_assert_eq!(
            self.area_size % self.sector_size,
            0,
            "flash area size is not a multiple of the sector size"
        );
        let remaining = self.area_size - self.pos;
        let size = self.sector_size.min(remaining);
        let sector = FlashSector {
            offset_in_area: self.pos,
            size,
        };
        self.pos += size;
        Some(sector)
    }
}
