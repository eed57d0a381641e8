// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image header parsing, TLV manifest reading, and the slot-state
//! collaborator traits (image validation, swap oracle, pending commit).
//!
//! None of the cryptographic or swap-algorithm logic lives here: this crate
//! only knows how to find the bytes those algorithms need.

#![cfg_attr(not(test), no_std)]

mod header;
mod tlv;
mod version;

pub use header::{ImageHeader, HEADER_MAGIC};
pub use tlv::{read_image_hash, ManifestError};
pub use version::ImageVersion;

/// The bootloader's verdict for the next boot, from the swap subsystem.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwapType {
    None,
    Test,
    Perm,
    Revert,
}

/// The swap-type oracle: an out-of-scope collaborator that knows the
/// swap algorithm's current verdict for an image.
pub trait SwapOracle {
    fn swap_type(&self, image_index: u8) -> SwapType;
}

/// The cryptographic image validator: an out-of-scope collaborator.
///
/// Treated strictly as a black box returning success/failure; callers must
/// not short-circuit based on the header magic alone (the magic only gates
/// whether it's worth calling this at all).
pub trait ImageValidator {
    fn validate(&self, header: &ImageHeader, area: &smp_flash::FlashArea) -> bool;
}

/// The slot-commitment primitive: an out-of-scope collaborator.
pub trait PendingSetter {
    fn set_pending(&self, image_index: u8, permanent: bool) -> Result<(), PendingError>;
}

/// Opaque failure from [`PendingSetter::set_pending`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingError;
