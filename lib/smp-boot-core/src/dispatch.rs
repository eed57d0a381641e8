// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The receive/route/reply loop tying every handler together, ported from
//! the dispatch table in the original's `boot_udp.c`.

use crate::collab::{Clock, ProgressSink, Reboot, Transport, TransportError};
use crate::config::BootConfig;
use crate::cursor::UploadCursor;
use crate::trace::{Trace, TraceLog};
use crate::{ils, sip, usm};
use core::marker::PhantomData;
use smp_flash::{FlashAreaTable, FlashIo, RawFlash};
use smp_image::{ImageValidator, PendingSetter, SwapOracle};
use smp_wire::{Encoder, Group, Header, Op, ResultCode, HEADER_LEN};

const RESET_DELAY_MS: u32 = 250;

/// Known `(group, id)` pairs this core routes. Anything else falls through
/// to the `{"rc": ENOTSUP}` default.
mod id {
    pub const OS_RESET: u8 = 5;
    pub const OS_PARAMS: u8 = 6;
    pub const IMAGE_STATE: u8 = 0;
    pub const IMAGE_UPLOAD: u8 = 1;
    pub const IMAGE_SLOT_INFO: u8 = 6;
}

/// Owns the per-connection state the original kept as process globals: the
/// upload cursor and the post-mortem trace log. Everything else (flash,
/// image validation, the transport) is borrowed for the duration of one
/// [`Dispatcher::run_once`] call.
pub struct Dispatcher<C, const TRACE_CAP: usize> {
    cursor: UploadCursor,
    trace: TraceLog<TRACE_CAP>,
    _config: PhantomData<C>,
}

impl<C: BootConfig, const TRACE_CAP: usize> Default for Dispatcher<C, TRACE_CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BootConfig, const TRACE_CAP: usize> Dispatcher<C, TRACE_CAP> {
    pub const fn new() -> Self {
        Self {
            cursor: UploadCursor::new(),
            trace: TraceLog::new(),
            _config: PhantomData,
        }
    }

    pub fn trace_log(&self) -> &TraceLog<TRACE_CAP> {
        &self.trace
    }

    /// Runs the receive loop until the transport reports a timeout, which
    /// is this core's only exit: control then returns to whatever decided
    /// to invoke it, which boots normally absent further activity.
    #[allow(clippy::too_many_arguments)]
    pub fn run<T, F, O, V, P, R, K, S>(
        &mut self,
        transport: &mut T,
        io: &FlashIo<'_, F>,
        table: &FlashAreaTable,
        oracle: &O,
        validator: &V,
        pending: &P,
        reboot: &R,
        clock: &K,
        progress: &mut S,
        recv_timeout_ms: u32,
    ) where
        T: Transport,
        F: RawFlash + ?Sized,
        O: SwapOracle,
        V: ImageValidator,
        P: PendingSetter,
        R: Reboot,
        K: Clock,
        S: ProgressSink,
    {
        let mut recv_buf = [0u8; C::MAX_DATAGRAM];
        let mut send_buf = [0u8; C::MAX_DATAGRAM];

        loop {
            let received = match transport.recv_from(&mut recv_buf, recv_timeout_ms) {
                Ok(Some(v)) => v,
                Ok(None) => return,
                Err(TransportError::Timeout) => return,
                Err(TransportError::Other) => {
                    log::warn!("dispatch: transport error, continuing");
                    continue;
                }
            };
            let (len, addr) = received;

            let Some((reply_len, is_reset)) = self.handle_datagram(
                &recv_buf[..len],
                &mut send_buf,
                io,
                table,
                oracle,
                validator,
                pending,
                progress,
            ) else {
                self.trace.record(Trace::Dropped);
                continue;
            };

            if let Err(_e) = transport.send_to(&send_buf[..reply_len], addr) {
                log::warn!("dispatch: send failed, dropping reply");
            }

            // The ack must reach the peer before we tear the link down, so
            // the reboot itself happens here rather than inside
            // `handle_datagram` (which has no access to `transport`).
            if is_reset {
                clock.sleep_ms(RESET_DELAY_MS);
                reboot.reboot();
            }
        }
    }

    /// Parses, routes, and replies to one datagram. Returns `None` when the
    /// datagram fails header validation and should be silently dropped;
    /// otherwise the length of the reply written into `send_buf` and
    /// whether the caller must sleep and reboot after sending it.
    #[allow(clippy::too_many_arguments)]
    fn handle_datagram<F, O, V, P, S>(
        &mut self,
        datagram: &[u8],
        send_buf: &mut [u8],
        io: &FlashIo<'_, F>,
        table: &FlashAreaTable,
        oracle: &O,
        validator: &V,
        pending: &P,
        progress: &mut S,
    ) -> Option<(usize, bool)>
    where
        F: RawFlash + ?Sized,
        O: SwapOracle,
        V: ImageValidator,
        P: PendingSetter,
        S: ProgressSink,
    {
        if datagram.len() < HEADER_LEN {
            return None;
        }
        let header = Header::parse(datagram)?;
        let payload_len = datagram.len() - HEADER_LEN;
        if header.length as usize > payload_len {
            return None;
        }
        let payload = &datagram[HEADER_LEN..HEADER_LEN + header.length as usize];

        self.trace.record(Trace::Dispatch {
            group: group_raw(header.group),
            id: header.id,
        });

        let mut is_reset = false;
        let mut cbor_buf = [0u8; 1024];
        debug_assert!(C::MAX_RESPONSE <= cbor_buf.len());
        let mut out = Encoder::new(&mut cbor_buf[..C::MAX_RESPONSE]);

        match (header.group, header.id, header.op) {
            (Group::Image, id::IMAGE_STATE, Op::Read) => {
                ils::list::<C, _, _, _>(io, table, oracle, validator, 0, &mut out);
            }
            (Group::Image, id::IMAGE_STATE, Op::Write) => {
                ils::set::<C, _, _, _, _>(io, table, oracle, validator, pending, payload, &mut out);
            }
            (Group::Image, id::IMAGE_UPLOAD, _) => {
                let mut on_trace = |t: Trace| self.trace.record(t);
                usm::upload::<C, _, _>(
                    io,
                    table,
                    pending,
                    &mut self.cursor,
                    progress,
                    payload,
                    &mut out,
                    &mut on_trace,
                );
            }
            (Group::Image, id::IMAGE_SLOT_INFO, Op::Read) => {
                sip::slot_info::<C>(table, &mut out);
            }
            (Group::Os, id::OS_PARAMS, Op::Read) => {
                sip::params::<C>(&mut out);
            }
            (Group::Os, id::OS_RESET, Op::Write) => {
                // Leave the reply empty: the common footer below encodes it
                // as the zero-length-payload ack. `run` sends it before
                // sleeping and rebooting, since this fn has no `transport`.
                self.trace.record(Trace::Reset);
                is_reset = true;
            }
            _ => {
                crate::response::emit_rc_only(&mut out, ResultCode::Unsupported);
            }
        }

        let body = out.as_bytes();
        let total = HEADER_LEN + body.len();
        header.encode_reply(body.len() as u16, send_buf);
        send_buf[HEADER_LEN..total].copy_from_slice(body);
        Some((total, is_reset))
    }
}

fn group_raw(group: Group) -> u16 {
    match group {
        Group::Os => 0,
        Group::Image => 1,
        Group::PerUser => 64,
        Group::Other(v) => v,
    }
}
