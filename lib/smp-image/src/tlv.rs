// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::header::ImageHeader;
use smp_flash::{FlashArea, FlashIo, RawFlash};

/// A `(type, length, payload)` entry in an image's trailing manifest.
///
/// Entries are concatenated directly after the image body; this reader
/// walks them in file order starting at `header_size + image_size`.
#[derive(Clone, Copy, Debug)]
struct TlvEntry {
    tag: u16,
    len: u16,
    offset: u32,
}

const TLV_ENTRY_SIZE: u32 = 4;

struct TlvIter<'a, R: RawFlash + ?Sized> {
    io: FlashIo<'a, R>,
    area: FlashArea,
    pos: u32,
    end: u32,
}

impl<'a, R: RawFlash + ?Sized> Iterator for TlvIter<'a, R> {
    type Item = Result<TlvEntry, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + TLV_ENTRY_SIZE > self.end {
            return None;
        }
        let mut raw = [0u8; 4];
        if self.io.read(&self.area, self.pos, &mut raw).is_err() {
            return Some(Err(ManifestError::IoError));
        }
        let tag = u16::from_le_bytes([raw[0], raw[1]]);
        let len = u16::from_le_bytes([raw[2], raw[3]]);
        let offset = self.pos + TLV_ENTRY_SIZE;
        self.pos = offset + len as u32;
        Some(Ok(TlvEntry { tag, len, offset }))
    }
}

/// Errors from manifest reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestError {
    /// No TLV of the expected type was found, or its length didn't match
    /// the expected hash size — the image is unidentifiable, not corrupt.
    NotFound,
    IoError,
}

/// Walks `area`'s TLV trailer looking for the entry whose type equals
/// `hash_tlv_type`, and returns its payload into `hash_out`.
///
/// `hash_out.len()` must equal the configured hash algorithm's digest size;
/// a TLV of the right type but wrong length is treated as "no identity
/// available" (`NotFound`), not a hard I/O failure.
pub fn read_image_hash<R: RawFlash + ?Sized>(
    io: &FlashIo<'_, R>,
    area: &FlashArea,
    header: &ImageHeader,
    hash_tlv_type: u16,
    hash_out: &mut [u8],
) -> Result<(), ManifestError> {
    let trailer_start = header.header_size as u32 + header.image_size;
    let iter = TlvIter {
        io: *io,
        area: *area,
        pos: trailer_start,
        end: area.size(),
    };

    for entry in iter {
        let entry = entry?;
        if entry.tag != hash_tlv_type {
            continue;
        }
        if entry.len as usize != hash_out.len() {
            return Err(ManifestError::NotFound);
        }
        return io
            .read(area, entry.offset, hash_out)
            .map_err(|_| ManifestError::IoError);
    }

    Err(ManifestError::NotFound)
}
