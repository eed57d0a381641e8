// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flash-area registry and aligned flash I/O.
//!
//! This crate mediates aligned, sector-based access to a board's internal
//! non-volatile memory. It never talks to hardware directly: callers supply
//! a [`RawFlash`] implementation (the actual NVM driver, out of scope here)
//! and this crate lifts that driver's alignment requirements for them.

#![cfg_attr(not(test), no_std)]

mod area;
mod io;

pub use area::{AreaKind, FlashArea, FlashSector, Sectors};
pub use io::FlashIo;

/// Minimum write granularity of the underlying storage, in bytes.
pub const ALIGN: u32 = 4;

/// Byte value read back from an erased flash cell.
pub const ERASED_VALUE: u8 = 0xFF;

/// The raw, unaligned non-volatile storage driver.
///
/// Implementations may require `addr` to be 4-byte aligned for `read` and
/// `write`, and `len` to be sector-aligned for `erase`; [`FlashIo`] is
/// responsible for only ever calling this trait with parameters that
/// satisfy those requirements.
pub trait RawFlash {
    /// Erase granularity of the device backing `device_id`, in bytes.
    fn sector_size(&self, device_id: u8) -> u32;
    fn read(&self, device_id: u8, addr: u32, dst: &mut [u8]) -> Result<(), IoFault>;
    fn write(&self, device_id: u8, addr: u32, src: &[u8]) -> Result<(), IoFault>;
    fn erase(&self, device_id: u8, addr: u32, len: u32) -> Result<(), IoFault>;
}

/// Opaque failure signal from a [`RawFlash`] implementation.
///
/// The driver is expected to have already logged or counted whatever detail
/// it has; by the time it reaches this crate all raw faults are equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IoFault;

/// Errors surfaced by the flash-area registry and aligned I/O layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashError {
    /// No area is registered for the requested [`AreaKind`].
    NotFound,
    /// The requested read/write/erase range falls outside the area.
    OutOfBounds,
    /// An erase offset or length was not a multiple of the sector size.
    Misaligned,
    /// The raw driver reported a fault.
    IoError,
}

impl core::fmt::Display for FlashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            FlashError::NotFound => "flash area not found",
            FlashError::OutOfBounds => "flash access out of bounds",
            FlashError::Misaligned => "flash access misaligned",
            FlashError::IoError => "flash I/O error",
        };
        f.write_str(s)
    }
}

/// A static mapping from [`AreaKind`] to its `(device, base_offset, size)`
/// record, built once at startup from board configuration.
///
/// Lookup is a linear scan, which is appropriate given the small, fixed
/// number of areas any board defines (spec budget: at most 8).
#[derive(Clone, Copy)]
pub struct FlashAreaTable<'a> {
    entries: &'a [(AreaKind, FlashArea)],
}

impl<'a> FlashAreaTable<'a> {
    pub const fn new(entries: &'a [(AreaKind, FlashArea)]) -> Self {
        Self { entries }
    }

    /// Looks up the area registered for `kind`.
    ///
    /// Areas are static for the lifetime of the device, so there is no
    /// `close`: callers simply stop using the returned [`FlashArea`] when
    /// they're done with it.
    pub fn open(&self, kind: AreaKind) -> Result<FlashArea, FlashError> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, area)| *area)
            .ok_or(FlashError::NotFound)
    }
}

/// Resolves the flash area backing a given image slot.
///
/// `slot == 0` is the primary (booted) slot, `slot == 1` is the secondary
/// (staging) slot; any other value is a caller error.
pub fn area_for_slot(image_index: u8, slot: u8) -> Result<AreaKind, FlashError> {
    match slot {
        0 => Ok(AreaKind::Primary(image_index)),
        1 => Ok(AreaKind::Secondary(image_index)),
        _ => Err(FlashError::NotFound),
    }
}
