// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CBOR map key literals, gathered in one place so a typo shows up once.

pub const IMAGE: &str = "image";
pub const DATA: &str = "data";
pub const LEN: &str = "len";
pub const OFF: &str = "off";
pub const CONFIRM: &str = "confirm";
pub const HASH: &str = "hash";
pub const RC: &str = "rc";
pub const IMAGES: &str = "images";
pub const BOOTABLE: &str = "bootable";
pub const CONFIRMED: &str = "confirmed";
pub const ACTIVE: &str = "active";
pub const PENDING: &str = "pending";
pub const PERMANENT: &str = "permanent";
pub const SLOT: &str = "slot";
pub const VERSION: &str = "version";
pub const BUF_SIZE: &str = "buf_size";
pub const BUF_COUNT: &str = "buf_count";
pub const SIZE: &str = "size";
pub const UPLOAD_IMAGE_ID: &str = "upload_image_id";
pub const SLOTS: &str = "slots";
