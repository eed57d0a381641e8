// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only slot/parameter metadata, ported from `bs_slot_info` and the
//! `params` handler in the original.

use crate::config::BootConfig;
use crate::keys;
use crate::response::encode_response;
use smp_flash::{area_for_slot, FlashAreaTable, FlashError};
use smp_wire::ResultCode;

enum SlotEntry {
    Ok { slot: u8, size: u32, upload_image_id: Option<u32> },
    Err(ResultCode),
}

fn gather_slot(table: &FlashAreaTable, image_index: u8, slot: u8) -> SlotEntry {
    let open = area_for_slot(image_index, slot).and_then(|kind| table.open(kind));
    match open {
        Ok(area) => SlotEntry::Ok {
            slot,
            size: area.size(),
            upload_image_id: (slot == 1).then(|| image_index as u32 * 2 + 1),
        },
        Err(FlashError::NotFound) => SlotEntry::Err(ResultCode::NotFound),
        Err(_) => SlotEntry::Err(ResultCode::InvalidRequest),
    }
}

fn encode_slot_entry(
    enc: &mut minicbor::Encoder<&mut smp_wire::Encoder<'_>>,
    entry: &SlotEntry,
) -> crate::response::CborResult {
    match entry {
        SlotEntry::Ok {
            slot,
            size,
            upload_image_id,
        } => {
            enc.map(if upload_image_id.is_some() { 3 } else { 2 })?;
            enc.str(keys::SLOT)?;
            enc.u32(*slot as u32)?;
            enc.str(keys::SIZE)?;
            enc.u32(*size)?;
            if let Some(id) = upload_image_id {
                enc.str(keys::UPLOAD_IMAGE_ID)?;
                enc.u32(*id)?;
            }
            Ok(())
        }
        SlotEntry::Err(code) => {
            enc.map(1)?;
            enc.str(keys::RC)?;
            enc.i32(code.as_i32())?;
            Ok(())
        }
    }
}

/// `{"images": [{"image": i, "slots": [slot_entry, slot_entry]}, ...]}` over
/// every configured image, generalizing the original's hardcoded single
/// image loop (see the design notes on this divergence).
pub fn slot_info<C: BootConfig>(table: &FlashAreaTable, out: &mut smp_wire::Encoder<'_>) {
    encode_response(out, |enc| {
        enc.map(1)?;
        enc.str(keys::IMAGES)?;
        enc.array(C::NUM_IMAGES as u64)?;
        for image_index in 0..C::NUM_IMAGES {
            let primary = gather_slot(table, image_index, 0);
            let secondary = gather_slot(table, image_index, 1);

            enc.map(2)?;
            enc.str(keys::IMAGE)?;
            enc.u32(image_index as u32)?;
            enc.str(keys::SLOTS)?;
            enc.array(2)?;
            encode_slot_entry(enc, &primary)?;
            encode_slot_entry(enc, &secondary)?;
        }
        Ok(())
    });
}

/// `{"buf_size": C::MAX_DATAGRAM, "buf_count": 1}` — this core only ever
/// holds a single datagram buffer in flight.
pub fn params<C: BootConfig>(out: &mut smp_wire::Encoder<'_>) {
    encode_response(out, |enc| {
        enc.map(2)?;
        enc.str(keys::BUF_SIZE)?;
        enc.u32(C::MAX_DATAGRAM as u32)?;
        enc.str(keys::BUF_COUNT)?;
        enc.u32(1)?;
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use smp_flash::{AreaKind, FlashArea};

    struct TestConfig;
    impl BootConfig for TestConfig {
        const NUM_IMAGES: u8 = 1;
        const HASH_SIZE: usize = 32;
        const SECTOR_SIZE: u32 = 128;
        const UDP_PORT: u16 = 1337;
    }

    struct TwoImageConfig;
    impl BootConfig for TwoImageConfig {
        const NUM_IMAGES: u8 = 2;
        const HASH_SIZE: usize = 32;
        const SECTOR_SIZE: u32 = 128;
        const UDP_PORT: u16 = 1337;
    }

    fn one_image_table() -> FlashAreaTable<'static> {
        static ENTRIES: [(AreaKind, FlashArea); 2] = [
            (AreaKind::Primary(0), FlashArea::new(0, 0, 4096)),
            (AreaKind::Secondary(0), FlashArea::new(0, 4096, 4096)),
        ];
        FlashAreaTable::new(&ENTRIES)
    }

    #[test]
    fn params_reports_the_configured_datagram_size() {
        let mut buf = [0u8; 256];
        let mut out = smp_wire::Encoder::new(&mut buf);
        params::<TestConfig>(&mut out);

        let mut dec = minicbor::Decoder::new(out.as_bytes());
        let n = dec.map().unwrap().unwrap();
        assert_eq!(n, 2);
        assert_eq!(dec.str().unwrap(), keys::BUF_SIZE);
        assert_eq!(dec.u32().unwrap(), 2048);
        assert_eq!(dec.str().unwrap(), keys::BUF_COUNT);
        assert_eq!(dec.u32().unwrap(), 1);
    }

    #[test]
    fn slot_info_reports_both_slots_of_a_configured_image() {
        let table = one_image_table();
        let mut buf = [0u8; 512];
        let mut out = smp_wire::Encoder::new(&mut buf);
        slot_info::<TestConfig>(&table, &mut out);

        let mut dec = minicbor::Decoder::new(out.as_bytes());
        assert_eq!(dec.map().unwrap().unwrap(), 1);
        assert_eq!(dec.str().unwrap(), keys::IMAGES);
        assert_eq!(dec.array().unwrap().unwrap(), 1);
        assert_eq!(dec.map().unwrap().unwrap(), 2);
        assert_eq!(dec.str().unwrap(), keys::IMAGE);
        assert_eq!(dec.u32().unwrap(), 0);
        assert_eq!(dec.str().unwrap(), keys::SLOTS);
        assert_eq!(dec.array().unwrap().unwrap(), 2);

        assert_eq!(dec.map().unwrap().unwrap(), 2);
        assert_eq!(dec.str().unwrap(), keys::SLOT);
        assert_eq!(dec.u32().unwrap(), 0);
        assert_eq!(dec.str().unwrap(), keys::SIZE);
        assert_eq!(dec.u32().unwrap(), 4096);

        assert_eq!(dec.map().unwrap().unwrap(), 3);
        assert_eq!(dec.str().unwrap(), keys::SLOT);
        assert_eq!(dec.u32().unwrap(), 1);
        assert_eq!(dec.str().unwrap(), keys::SIZE);
        assert_eq!(dec.u32().unwrap(), 4096);
        assert_eq!(dec.str().unwrap(), keys::UPLOAD_IMAGE_ID);
        assert_eq!(dec.u32().unwrap(), 1);
    }

    #[test]
    fn slot_info_reports_an_error_entry_for_an_unconfigured_image() {
        let table = one_image_table();
        let mut buf = [0u8; 512];
        let mut out = smp_wire::Encoder::new(&mut buf);
        slot_info::<TwoImageConfig>(&table, &mut out);

        let mut dec = minicbor::Decoder::new(out.as_bytes());
        assert_eq!(dec.map().unwrap().unwrap(), 1);
        assert_eq!(dec.str().unwrap(), keys::IMAGES);
        assert_eq!(dec.array().unwrap().unwrap(), 2);

        // image 0: both slots present, skipped whole.
        dec.skip().unwrap();

        // image 1: not in the table, both slots error.
        assert_eq!(dec.map().unwrap().unwrap(), 2);
        assert_eq!(dec.str().unwrap(), keys::IMAGE);
        assert_eq!(dec.u32().unwrap(), 1);
        assert_eq!(dec.str().unwrap(), keys::SLOTS);
        assert_eq!(dec.array().unwrap().unwrap(), 2);
        assert_eq!(dec.map().unwrap().unwrap(), 1);
        assert_eq!(dec.str().unwrap(), keys::RC);
        assert_eq!(dec.i32().unwrap(), ResultCode::NotFound.as_i32());
    }
}
