// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A bounded-buffer `minicbor` writer, standing in for the shared
//! encode-state-plus-scratch-buffer the original implementation uses
//! (`cbor_state`/`bs_obuf`), including its reset-on-overflow contract.

/// Largest response payload this protocol will emit.
pub const MAX_RESPONSE_LEN: usize = 1024;

/// Raised when an encode would write past the end of the scratch buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow;

impl core::fmt::Display for Overflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("cbor encode buffer overflow")
    }
}

/// A fixed-capacity byte buffer with a write cursor, implementing
/// [`minicbor::encode::Write`] so `minicbor::Encoder` can write directly
/// into it.
///
/// A single instance of this is meant to be reused across every response
/// the dispatcher emits: call [`Encoder::reset`] before each one, exactly
/// as the original resets its shared CBOR encode state at the top of
/// `boot_grp_procces`.
pub struct Encoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Discards everything written so far without losing the buffer.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// The encoded payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Starts a `minicbor` encoder borrowing this buffer.
    pub fn cbor(&mut self) -> minicbor::Encoder<&mut Self> {
        minicbor::Encoder::new(self)
    }
}

impl minicbor::encode::Write for Encoder<'_> {
    type Error = Overflow;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let end = self.pos.checked_add(data.len()).ok_or(Overflow)?;
        if end > self.buf.len() {
            return Err(Overflow);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }
}
