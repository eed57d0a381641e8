// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smp_flash::FlashArea;

/// The resumable write cursor for one in-flight image upload.
///
/// Owned by the dispatcher as an ordinary field — not a mutable global —
/// per the redesign spec.md §9 calls for: the cooperative single-threaded
/// model that made a singleton safe in the original doesn't require one in
/// a language with first-class ownership.
#[derive(Clone, Copy, Debug, Default)]
pub struct UploadCursor {
    img_num: Option<u8>,
    img_size: u32,
    curr_off: u32,
    area: Option<FlashArea>,
}

impl UploadCursor {
    pub const fn new() -> Self {
        Self {
            img_num: None,
            img_size: 0,
            curr_off: 0,
            area: None,
        }
    }

    pub fn img_num(&self) -> Option<u8> {
        self.img_num
    }

    pub fn curr_off(&self) -> u32 {
        self.curr_off
    }

    pub fn img_size(&self) -> u32 {
        self.img_size
    }

    pub fn area(&self) -> Option<FlashArea> {
        self.area
    }

    /// Starts (or implicitly restarts) an upload at offset 0.
    pub fn begin(&mut self, img_num: u8, area: FlashArea, img_size: u32) {
        self.img_num = Some(img_num);
        self.area = Some(area);
        self.img_size = img_size;
        self.curr_off = 0;
    }

    pub fn advance(&mut self, bytes_written: u32) {
        self.curr_off = self.curr_off.saturating_add(bytes_written);
    }

    pub fn is_complete(&self) -> bool {
        self.area.is_some() && self.curr_off == self.img_size
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
