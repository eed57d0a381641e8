// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The resumable chunked-upload state machine, ported from `bs_upload` in
//! the original. The most delicate component: offset bookkeeping,
//! idempotent replay, and the trailing unaligned-write pad all have to
//! agree exactly with what the peer expects on retransmission.

use crate::collab::ProgressSink;
use crate::config::BootConfig;
use crate::cursor::UploadCursor;
use crate::keys;
use crate::response::{emit_rc_only, encode_response};
use crate::trace::Trace;
use smp_flash::{area_for_slot, FlashAreaTable, FlashIo, RawFlash};
use smp_image::PendingSetter;
use smp_wire::{Encoder, ResultCode};

/// Upper bound on `BootConfig::ALIGN` this crate supports; the true
/// storage alignment for every target this protocol has shipped on is 4
/// or 8 bytes.
const MAX_ALIGN: usize = 8;

#[derive(Clone, Copy)]
struct Request<'a> {
    image: Option<u32>,
    data: Option<&'a [u8]>,
    len: Option<u32>,
    off: Option<u32>,
}

fn decode_request<'a>(payload: &'a [u8]) -> Option<Request<'a>> {
    let mut req = Request {
        image: None,
        data: None,
        len: None,
        off: None,
    };
    let mut dec = minicbor::Decoder::new(payload);
    let n = dec.map().ok()?.unwrap_or(0);
    for _ in 0..n {
        let key = dec.str().ok()?;
        match key {
            keys::IMAGE => req.image = Some(dec.u32().ok()?),
            keys::DATA => req.data = Some(dec.bytes().ok()?),
            keys::LEN => req.len = Some(dec.u32().ok()?),
            keys::OFF => req.off = Some(dec.u32().ok()?),
            _ => dec.skip().ok()?,
        }
    }
    Some(req)
}

/// Runs one upload request to completion, mutating `cursor` and writing a
/// `{"rc": code[, "off": offset]}` reply into `out`.
#[allow(clippy::too_many_arguments)]
pub fn upload<C, F, P>(
    io: &FlashIo<'_, F>,
    table: &FlashAreaTable,
    pending: &P,
    cursor: &mut UploadCursor,
    progress: &mut dyn ProgressSink,
    payload: &[u8],
    out: &mut Encoder<'_>,
    on_trace: &mut dyn FnMut(Trace),
) where
    C: BootConfig,
    F: RawFlash + ?Sized,
    P: PendingSetter,
{
    let result = run::<C, F, P>(io, table, pending, cursor, progress, payload, on_trace);

    match result {
        Ok(off) => encode_response(out, |enc| {
            enc.map(2)?;
            enc.str(keys::RC)?;
            enc.i32(ResultCode::Ok.as_i32())?;
            enc.str(keys::OFF)?;
            enc.u32(off)?;
            Ok(())
        }),
        Err(code) => emit_rc_only(out, code),
    }
}

fn run<C, F, P>(
    io: &FlashIo<'_, F>,
    table: &FlashAreaTable,
    pending: &P,
    cursor: &mut UploadCursor,
    progress: &mut dyn ProgressSink,
    payload: &[u8],
    on_trace: &mut dyn FnMut(Trace),
) -> Result<u32, ResultCode>
where
    C: BootConfig,
    F: RawFlash + ?Sized,
    P: PendingSetter,
{
    let req = decode_request(payload).ok_or(ResultCode::InvalidRequest)?;
    let data = req.data.ok_or(ResultCode::InvalidRequest)?;
    let off = req.off.ok_or(ResultCode::InvalidRequest)?;
    let chunk_len = data.len() as u32;

    if off == 0 {
        let img_num = req.image.unwrap_or(0) as u8;
        let total_len = req.len.ok_or(ResultCode::InvalidRequest)?;
        let kind = area_for_slot(img_num, 1).map_err(|_| ResultCode::InvalidRequest)?;
        let area = table.open(kind).map_err(|_| ResultCode::InvalidRequest)?;
        if total_len > area.size() {
            return Err(ResultCode::InvalidRequest);
        }
        io.erase(&area, 0, area.size())
            .map_err(|_| ResultCode::InvalidRequest)?;
        on_trace(Trace::Erase {
            off: 0,
            len: area.size(),
        });
        cursor.begin(img_num, area, total_len);
        on_trace(Trace::UploadStart {
            img_num,
            img_size: total_len,
        });
        log::debug!("upload: image {img_num} started, {total_len} bytes");
    } else if off != cursor.curr_off() {
        on_trace(Trace::UploadDuplicate { off });
        log::debug!("upload: duplicate chunk at {off}, current offset {}", cursor.curr_off());
        return Ok(cursor.curr_off());
    } else if cursor.curr_off() + chunk_len > cursor.img_size() {
        return Err(ResultCode::InvalidRequest);
    }

    let area = cursor.area().ok_or(ResultCode::InvalidRequest)?;
    let curr_off = cursor.curr_off();
    let img_size = cursor.img_size();

    let rem_all = chunk_len % C::ALIGN;
    let main_len = chunk_len - rem_all;
    let is_final = curr_off + chunk_len >= img_size;
    let rem = if is_final { rem_all } else { 0 };

    on_trace(Trace::UploadChunk {
        off: curr_off,
        len: chunk_len as u16,
    });
    log::trace!("upload: writing 0x{curr_off:x}..0x{:x}", curr_off + main_len);

    io.write(&area, curr_off, &data[..main_len as usize])
        .map_err(|_| ResultCode::InvalidRequest)?;

    if rem > 0 {
        debug_assert!((C::ALIGN as usize) <= MAX_ALIGN);
        let mut word = [area.erased_value(); MAX_ALIGN];
        let tail_start = main_len as usize;
        word[..rem as usize].copy_from_slice(&data[tail_start..tail_start + rem as usize]);
        io.write(&area, curr_off + main_len, &word[..C::ALIGN as usize])
            .map_err(|_| ResultCode::InvalidRequest)?;
    }

    let committed = main_len + rem;
    let new_off = curr_off + committed;

    if img_size > 0 {
        let was_pct = curr_off as u64 * 100 / img_size as u64;
        let now_pct = new_off as u64 * 100 / img_size as u64;
        if was_pct != now_pct {
            progress.on_progress(now_pct as u8);
        }
    }

    cursor.advance(committed);

    if cursor.is_complete() {
        let img_num = cursor.img_num().ok_or(ResultCode::InvalidRequest)?;
        pending
            .set_pending(img_num, true)
            .map_err(|_| ResultCode::InvalidRequest)?;
        on_trace(Trace::SetPending {
            img_num,
            permanent: true,
        });
        on_trace(Trace::UploadComplete { img_num });
        log::info!("upload: image {img_num} complete, marked pending");
    }

    Ok(cursor.curr_off())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::ProgressSink;
    use smp_flash::{AreaKind, FlashArea, IoFault};
    use smp_image::PendingError;
    use std::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    struct TestConfig;
    impl BootConfig for TestConfig {
        const NUM_IMAGES: u8 = 1;
        const HASH_SIZE: usize = 32;
        const SECTOR_SIZE: u32 = 128;
        const UDP_PORT: u16 = 1337;
    }

    struct FakeFlash {
        mem: RefCell<Vec<u8>>,
        erases: RefCell<u32>,
    }

    impl FakeFlash {
        fn new(size: usize) -> Self {
            Self {
                mem: RefCell::new(vec![0xFFu8; size]),
                erases: RefCell::new(0),
            }
        }
    }

    impl RawFlash for FakeFlash {
        fn sector_size(&self, _device_id: u8) -> u32 {
            128
        }
        fn read(&self, _device_id: u8, addr: u32, dst: &mut [u8]) -> Result<(), IoFault> {
            let mem = self.mem.borrow();
            dst.copy_from_slice(&mem[addr as usize..addr as usize + dst.len()]);
            Ok(())
        }
        fn write(&self, _device_id: u8, addr: u32, src: &[u8]) -> Result<(), IoFault> {
            let mut mem = self.mem.borrow_mut();
            mem[addr as usize..addr as usize + src.len()].copy_from_slice(src);
            Ok(())
        }
        fn erase(&self, _device_id: u8, addr: u32, len: u32) -> Result<(), IoFault> {
            *self.erases.borrow_mut() += 1;
            let mut mem = self.mem.borrow_mut();
            for b in &mut mem[addr as usize..addr as usize + len as usize] {
                *b = 0xFF;
            }
            Ok(())
        }
    }

    struct FakePending {
        calls: RefCell<Vec<(u8, bool)>>,
    }
    impl FakePending {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }
    impl PendingSetter for FakePending {
        fn set_pending(&self, image_index: u8, permanent: bool) -> Result<(), PendingError> {
            self.calls.borrow_mut().push((image_index, permanent));
            Ok(())
        }
    }

    fn table() -> FlashAreaTable<'static> {
        static ENTRIES: [(AreaKind, FlashArea); 1] =
            [(AreaKind::Secondary(0), FlashArea::new(0, 0, 4096))];
        FlashAreaTable::new(&ENTRIES)
    }

    fn encode_chunk(off: u32, len: Option<u32>, data: &[u8]) -> Vec<u8> {
        let mut buf = [0u8; 2048];
        let mut sw = smp_wire::Encoder::new(&mut buf);
        let mut enc = sw.cbor();
        let n = if len.is_some() { 3 } else { 2 };
        enc.map(n).unwrap();
        enc.str(keys::OFF).unwrap();
        enc.u32(off).unwrap();
        enc.str(keys::DATA).unwrap();
        enc.bytes(data).unwrap();
        if let Some(l) = len {
            enc.str(keys::LEN).unwrap();
            enc.u32(l).unwrap();
        }
        sw.as_bytes().to_vec()
    }

    #[test]
    fn aligned_two_chunk_upload_completes_and_sets_pending_once() {
        let flash = FakeFlash::new(4096);
        let io = FlashIo::new(&flash);
        let tbl = table();
        let pending = FakePending::new();
        let mut cursor = UploadCursor::new();
        let mut out_buf = [0u8; 1024];

        let image = vec![0xABu8; 1024];
        let chunk1 = encode_chunk(0, Some(1024), &image[..512]);
        let mut out = smp_wire::Encoder::new(&mut out_buf);
        upload::<TestConfig, _, _>(
            &io,
            &tbl,
            &pending,
            &mut cursor,
            &mut (),
            &chunk1,
            &mut out,
            &mut |_| {},
        );
        assert_eq!(cursor.curr_off(), 512);

        let chunk2 = encode_chunk(512, None, &image[512..]);
        let mut out2_buf = [0u8; 1024];
        let mut out2 = smp_wire::Encoder::new(&mut out2_buf);
        upload::<TestConfig, _, _>(
            &io,
            &tbl,
            &pending,
            &mut cursor,
            &mut (),
            &chunk2,
            &mut out2,
            &mut |_| {},
        );
        assert_eq!(cursor.curr_off(), 1024);
        assert_eq!(&flash.mem.borrow()[0..1024], &image[..]);
        assert_eq!(pending.calls.borrow().as_slice(), &[(0u8, true)]);
    }

    #[test]
    fn unaligned_tail_is_padded_with_erased_value() {
        let flash = FakeFlash::new(4096);
        let io = FlashIo::new(&flash);
        let tbl = table();
        let pending = FakePending::new();
        let mut cursor = UploadCursor::new();

        let mut image = vec![0x42u8; 1025];
        *image.last_mut().unwrap() = 0x99;
        let chunk = encode_chunk(0, Some(1025), &image);
        let mut out_buf = [0u8; 1024];
        let mut out = smp_wire::Encoder::new(&mut out_buf);
        upload::<TestConfig, _, _>(
            &io, &tbl, &pending, &mut cursor, &mut (), &chunk, &mut out, &mut |_| {},
        );

        assert_eq!(cursor.curr_off(), 1025);
        let mem = flash.mem.borrow();
        assert_eq!(mem[1024], 0x99);
        assert_eq!(&mem[1025..1028], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn duplicate_chunk_is_idempotent_and_does_not_reerase() {
        let flash = FakeFlash::new(4096);
        let io = FlashIo::new(&flash);
        let tbl = table();
        let pending = FakePending::new();
        let mut cursor = UploadCursor::new();

        let image = vec![0x01u8; 512];
        let chunk = encode_chunk(0, Some(1024), &image);
        let mut out_buf = [0u8; 1024];
        let mut out = smp_wire::Encoder::new(&mut out_buf);
        upload::<TestConfig, _, _>(
            &io, &tbl, &pending, &mut cursor, &mut (), &chunk, &mut out, &mut |_| {},
        );
        assert_eq!(cursor.curr_off(), 512);
        assert_eq!(*flash.erases.borrow(), 1);
        let mem_before = flash.mem.borrow().clone();

        // Replay of an already-written chunk at an offset that is neither
        // `0` (the begin-upload branch) nor `curr_off()`: must be a no-op.
        let duplicate = encode_chunk(256, None, &image[256..]);
        let mut out2_buf = [0u8; 1024];
        let mut out2 = smp_wire::Encoder::new(&mut out2_buf);
        upload::<TestConfig, _, _>(
            &io, &tbl, &pending, &mut cursor, &mut (), &duplicate, &mut out2, &mut |_| {},
        );

        assert_eq!(cursor.curr_off(), 512);
        assert_eq!(*flash.erases.borrow(), 1);
        assert_eq!(flash.mem.borrow().as_slice(), mem_before.as_slice());

        let mut dec = minicbor::Decoder::new(out2.as_bytes());
        assert_eq!(dec.map().unwrap().unwrap(), 2);
        assert_eq!(dec.str().unwrap(), keys::RC);
        assert_eq!(dec.i32().unwrap(), 0);
        assert_eq!(dec.str().unwrap(), keys::OFF);
        assert_eq!(dec.u32().unwrap(), 512);
    }

    #[test]
    fn oversized_image_is_rejected_before_erase() {
        let flash = FakeFlash::new(4096);
        let io = FlashIo::new(&flash);
        let tbl = table();
        let pending = FakePending::new();
        let mut cursor = UploadCursor::new();

        let chunk = encode_chunk(0, Some(8192), &[0u8; 16]);
        let mut out_buf = [0u8; 1024];
        let mut out = smp_wire::Encoder::new(&mut out_buf);
        upload::<TestConfig, _, _>(
            &io, &tbl, &pending, &mut cursor, &mut (), &chunk, &mut out, &mut |_| {},
        );
        assert_eq!(*flash.erases.borrow(), 0);
    }
}
