// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image list/set: slot enumeration and the hash-addressed pending/confirm
//! command, ported from `bs_list`/`bs_set` in the original.

use crate::config::BootConfig;
use crate::keys;
use crate::response::{emit_rc_only, encode_response};
use smp_flash::{area_for_slot, FlashAreaTable, FlashIo, RawFlash};
use smp_image::{ImageHeader, ImageValidator, PendingSetter, SwapOracle, SwapType};
use smp_wire::{Encoder, ResultCode};

const MAX_HASH_SIZE: usize = 64;
const SECONDARY_SLOT: u8 = 1;
const PRIMARY_SLOT: u8 = 0;

struct SlotView {
    slot: u8,
    bootable: bool,
    confirmed: bool,
    active: bool,
    pending: bool,
    permanent: bool,
    has_hash: bool,
    hash_buf: [u8; MAX_HASH_SIZE],
    version: smp_image::ImageVersion,
}

fn derive_flags(swap: SwapType, slot: u8) -> (bool, bool, bool, bool) {
    // (confirmed, active, pending, permanent)
    match (swap, slot == PRIMARY_SLOT) {
        (SwapType::None, true) => (true, true, false, false),
        (SwapType::None, false) => (false, false, false, false),
        (SwapType::Test, true) => (true, false, false, false),
        (SwapType::Test, false) => (false, false, true, false),
        (SwapType::Perm, true) => (true, false, false, false),
        (SwapType::Perm, false) => (false, false, true, true),
        (SwapType::Revert, true) => (false, true, false, false),
        (SwapType::Revert, false) => (true, false, false, false),
    }
}

fn gather_slot<C, F, O, V>(
    io: &FlashIo<'_, F>,
    table: &FlashAreaTable,
    oracle: &O,
    validator: &V,
    image_index: u8,
    slot: u8,
) -> Option<SlotView>
where
    C: BootConfig,
    F: RawFlash + ?Sized,
    O: SwapOracle,
    V: ImageValidator,
{
    let kind = area_for_slot(image_index, slot).ok()?;
    let area = table.open(kind).ok()?;

    let mut hdr_buf = [0u8; ImageHeader::SIZE];
    io.read(&area, 0, &mut hdr_buf).ok()?;
    let header = ImageHeader::from_bytes(&hdr_buf)?;
    if !header.is_magic_valid() {
        return None;
    }
    if !validator.validate(&header, &area) {
        return None;
    }

    let mut hash_buf = [0u8; MAX_HASH_SIZE];
    let has_hash = smp_image::read_image_hash(
        io,
        &area,
        &header,
        C::HASH_TLV_TYPE,
        &mut hash_buf[..C::HASH_SIZE],
    )
    .is_ok();

    let swap = oracle.swap_type(image_index);
    let (confirmed, active, pending, permanent) = derive_flags(swap, slot);

    Some(SlotView {
        slot,
        bootable: header.is_bootable(),
        confirmed,
        active,
        pending,
        permanent,
        has_hash,
        hash_buf,
        version: header.version(),
    })
}

fn encode_slot(
    enc: &mut minicbor::Encoder<&mut Encoder<'_>>,
    view: &SlotView,
    hash_size: usize,
) -> crate::response::CborResult {
    let mut entries: u64 = 2; // "slot" + "version"
    if view.bootable {
        entries += 1;
    }
    if view.confirmed {
        entries += 1;
    }
    if view.active {
        entries += 1;
    }
    if view.pending {
        entries += 1;
    }
    if view.permanent {
        entries += 1;
    }
    if view.has_hash {
        entries += 1;
    }

    enc.map(entries)?;
    if view.bootable {
        enc.str(keys::BOOTABLE)?;
        enc.bool(true)?;
    }
    if view.confirmed {
        enc.str(keys::CONFIRMED)?;
        enc.bool(true)?;
    }
    if view.active {
        enc.str(keys::ACTIVE)?;
        enc.bool(true)?;
    }
    if view.pending {
        enc.str(keys::PENDING)?;
        enc.bool(true)?;
    }
    if view.permanent {
        enc.str(keys::PERMANENT)?;
        enc.bool(true)?;
    }
    enc.str(keys::SLOT)?;
    enc.u32(view.slot as u32)?;
    if view.has_hash {
        enc.str(keys::HASH)?;
        enc.bytes(&view.hash_buf[..hash_size])?;
    }
    enc.str(keys::VERSION)?;
    enc.str(view.version.format().as_str())?;
    Ok(())
}

/// `{"images": [slot_map, ...]}` for the two slots of `image_index`.
pub fn list<C, F, O, V>(
    io: &FlashIo<'_, F>,
    table: &FlashAreaTable,
    oracle: &O,
    validator: &V,
    image_index: u8,
    out: &mut Encoder<'_>,
) where
    C: BootConfig,
    F: RawFlash + ?Sized,
    O: SwapOracle,
    V: ImageValidator,
{
    let views = [
        gather_slot::<C, _, _, _>(io, table, oracle, validator, image_index, 0),
        gather_slot::<C, _, _, _>(io, table, oracle, validator, image_index, 1),
    ];
    let present: heapless::Vec<&SlotView, 2> = views.iter().flatten().collect();

    encode_response(out, |enc| {
        enc.map(1)?;
        enc.str(keys::IMAGES)?;
        enc.array(present.len() as u64)?;
        for view in &present {
            encode_slot(enc, view, C::HASH_SIZE)?;
        }
        Ok(())
    });
}

/// Decodes `{"confirm": bool?, "hash": bytes?}` and either sets the
/// matching image pending/confirmed, or replies with an error `rc`.
pub fn set<C, F, O, V, P>(
    io: &FlashIo<'_, F>,
    table: &FlashAreaTable,
    oracle: &O,
    validator: &V,
    pending: &P,
    payload: &[u8],
    out: &mut Encoder<'_>,
) where
    C: BootConfig,
    F: RawFlash + ?Sized,
    O: SwapOracle,
    V: ImageValidator,
    P: PendingSetter,
{
    let mut confirm = false;
    let mut hash = [0u8; MAX_HASH_SIZE];
    let mut hash_len: Option<usize> = None;

    let mut dec = minicbor::Decoder::new(payload);
    let parsed = (|| -> Result<(), minicbor::decode::Error> {
        let n = dec.map()?.unwrap_or(0);
        for _ in 0..n {
            let key = dec.str()?;
            match key {
                "confirm" => confirm = dec.bool()?,
                "hash" => {
                    let bytes = dec.bytes()?;
                    if bytes.len() <= MAX_HASH_SIZE {
                        hash[..bytes.len()].copy_from_slice(bytes);
                        hash_len = Some(bytes.len());
                    } else {
                        hash_len = Some(usize::MAX);
                    }
                }
                _ => {
                    dec.skip()?;
                }
            }
        }
        Ok(())
    })();

    if parsed.is_err() {
        emit_rc_only(out, ResultCode::InvalidRequest);
        return;
    }

    match hash_len {
        Some(len) if len != C::HASH_SIZE => {
            emit_rc_only(out, ResultCode::InvalidRequest);
            return;
        }
        None if C::NUM_IMAGES > 1 => {
            emit_rc_only(out, ResultCode::InvalidRequest);
            return;
        }
        _ => {}
    }

    let image_index = if hash_len.is_some() {
        let mut found = None;
        for candidate in 0..C::NUM_IMAGES {
            if let Some(view) =
                gather_slot::<C, _, _, _>(io, table, oracle, validator, candidate, SECONDARY_SLOT)
            {
                if view.has_hash && view.hash_buf[..C::HASH_SIZE] == hash[..C::HASH_SIZE] {
                    found = Some(candidate);
                    break;
                }
            }
        }
        match found {
            Some(i) => i,
            None => {
                emit_rc_only(out, ResultCode::NotFound);
                return;
            }
        }
    } else {
        0
    };

    match pending.set_pending(image_index, confirm) {
        Ok(()) => list::<C, _, _, _>(io, table, oracle, validator, image_index, out),
        Err(_) => emit_rc_only(out, ResultCode::InvalidRequest),
    }
}
