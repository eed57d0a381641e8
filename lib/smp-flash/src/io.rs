// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::area::{FlashArea, Sectors};
use crate::{FlashError, RawFlash};

/// Scratch buffer used to shuttle unaligned reads through the raw driver.
/// Must be a multiple of 4.
const SCRATCH_SIZE: usize = 256;

/// Lifts the raw driver's 4-byte alignment requirements for read/write, and
/// enforces sector alignment for erase.
///
/// `FlashIo` borrows the raw driver rather than owning it, mirroring how
/// the flash update server this is modeled on holds a reference to the
/// register block for the lifetime of a single request.
#[derive(Clone, Copy)]
pub struct FlashIo<'a, R: ?Sized> {
    raw: &'a R,
}

impl<'a, R: RawFlash + ?Sized> FlashIo<'a, R> {
    pub fn new(raw: &'a R) -> Self {
        Self { raw }
    }

    fn bounds_check(area: &FlashArea, off: u32, len: u32) -> Result<(), FlashError> {
        match off.checked_add(len) {
            Some(end) if end <= area.size => Ok(()),
            _ => Err(FlashError::OutOfBounds),
        }
    }

    /// Enumerates the sectors tiling `area`.
    pub fn sectors(&self, area: &FlashArea) -> Sectors {
        Sectors {
            area_size: area.size,
            sector_size: self.raw.sector_size(area.device_id),
            pos: 0,
        }
    }

    /// Reads `dst.len()` bytes from `area` at offset `off`.
    ///
    /// Falls back to a 256-byte aligned scratch buffer when the physical
    /// address, destination, or length are not all 4-byte aligned.
    pub fn read(&self, area: &FlashArea, off: u32, dst: &mut [u8]) -> Result<(), FlashError> {
        let len = dst.len();
        Self::bounds_check(area, off, len as u32)?;
        if len == 0 {
            return Ok(());
        }

        let phys = area.base_offset + off;
        if phys % 4 == 0 && (dst.as_ptr() as usize) % 4 == 0 && len % 4 == 0 {
            return self
                .raw
                .read(area.device_id, phys, dst)
                .map_err(|_| FlashError::IoError);
        }

        let addr_offset = (phys & 3) as usize;
        let mut addr = phys - addr_offset as u32;
        let mut skip = addr_offset;
        let mut remaining = len;
        let mut dst_pos = 0;
        let mut scratch = [0u8; SCRATCH_SIZE];

        while remaining > 0 {
            let wanted = remaining + skip;
            let chunk = wanted.min(SCRATCH_SIZE);
            let chunk = (chunk + 3) & !3;
            self.raw
                .read(area.device_id, addr, &mut scratch[..chunk])
                .map_err(|_| FlashError::IoError)?;

            let available = chunk - skip;
            let take = available.min(remaining);
            dst[dst_pos..dst_pos + take].copy_from_slice(&scratch[skip..skip + take]);

            dst_pos += take;
            remaining -= take;
            addr += chunk as u32;
            skip = 0;
        }

        Ok(())
    }

    /// Writes `src` to `area` at offset `off`.
    ///
    /// Writes shorter than the alignment unit are promoted to a
    /// read-modify-write of the full word, preserving the bytes the raw
    /// driver's word-write granularity would otherwise clobber.
    pub fn write(&self, area: &FlashArea, off: u32, src: &[u8]) -> Result<(), FlashError> {
        let len = src.len();
        Self::bounds_check(area, off, len as u32)?;
        if len == 0 {
            return Ok(());
        }

        let phys = area.base_offset + off;
        if len < crate::ALIGN as usize {
            let mut word = [area.erased_value(); crate::ALIGN as usize];
            self.raw
                .read(area.device_id, phys, &mut word)
                .map_err(|_| FlashError::IoError)?;
            word[..len].copy_from_slice(src);
            self.raw
                .write(area.device_id, phys, &word)
                .map_err(|_| FlashError::IoError)
        } else {
            self.raw
                .write(area.device_id, phys, src)
                .map_err(|_| FlashError::IoError)
        }
    }

    /// Erases `len` bytes of `area` starting at `off`.
    ///
    /// Both `off` and `len` must be multiples of the device's sector size.
    pub fn erase(&self, area: &FlashArea, off: u32, len: u32) -> Result<(), FlashError> {
        let sector = self.raw.sector_size(area.device_id);
        if off % sector != 0 || len % sector != 0 {
            return Err(FlashError::Misaligned);
        }
        Self::bounds_check(area, off, len)?;
        self.raw
            .erase(area.device_id, area.base_offset + off, len)
            .map_err(|_| FlashError::IoError)
    }
}
