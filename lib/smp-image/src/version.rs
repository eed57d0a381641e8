// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt::Write;

/// An image's `(major, minor, revision, build)` version tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build: u32,
}

/// Longest formatted version string: `"255.255.65535.4294967295"`.
pub const MAX_VERSION_LEN: usize = 25;

impl ImageVersion {
    /// Formats as `"M.m.r"`, with an optional `.b` suffix when `build != 0`.
    pub fn format(&self) -> heapless::String<MAX_VERSION_LEN> {
        let mut s = heapless::String::new();
        // heapless::String's capacity matches MAX_VERSION_LEN, so these
        // writes cannot fail.
        let _ = write!(s, "{}.{}.{}", self.major, self.minor, self.revision);
        if self.build != 0 {
            let _ = write!(s, ".{}", self.build);
        }
        s
    }
}
