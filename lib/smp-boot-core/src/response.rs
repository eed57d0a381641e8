// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::keys;
use smp_wire::{Encoder, ResultCode};

/// Result of one CBOR map/value-building closure.
pub type CborResult = Result<(), minicbor::encode::Error<smp_wire::Overflow>>;

/// Resets `out`, runs `build` against a fresh encoder, and commits the
/// result. If `build` overflows the buffer, discards whatever partial
/// output it left and falls back to the minimal `{"rc": NOMEM}` reply —
/// the same recovery the original performs by resetting its shared CBOR
/// encode state and replying `MGMT_ERR_ENOMEM`.
pub fn encode_response<'a, F>(out: &mut Encoder<'a>, build: F)
where
    F: FnOnce(&mut minicbor::Encoder<&mut Encoder<'a>>) -> CborResult,
{
    out.reset();
    let ok = {
        let mut enc = out.cbor();
        build(&mut enc).is_ok()
    };
    if ok {
        return;
    }
    log::warn!("cbor encode overflow, falling back to ENOMEM");
    emit_rc_only(out, ResultCode::NoMemory);
}

/// Emits `{"rc": code}` and nothing else. Used both as the overflow
/// fallback and directly by handlers whose only possible success shape is
/// an error report.
pub fn emit_rc_only(out: &mut Encoder<'_>, code: ResultCode) {
    out.reset();
    let mut enc = out.cbor();
    let _ = (|| -> CborResult {
        enc.map(1)?;
        enc.str(keys::RC)?;
        enc.i32(code.as_i32())?;
        Ok(())
    })();
}
