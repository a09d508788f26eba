//! Two-slot generation journal for one store region.
//!
//! A slot is `[marker: u32][sequence: u32][record bytes]`. The marker walks
//! erased -> writing -> valid, each step only clearing bits, and the flip to
//! valid is the last and smallest write of a commit. A power cut before the
//! flip leaves the previous generation untouched and valid; a cut during the
//! flip leaves a marker that matches neither state, which recovery discards.

use super::layout::{MAX_RECORD_LEN, Region, SLOT_HEADER_LEN, SLOTS_PER_REGION};
use crate::flash::{FlashError, SpiFlash};

/// Programmed before the record bytes go in.
const MARKER_WRITING: u32 = 0xFFFF_FF00;
/// Programmed last; every bit it clears is still set in [`MARKER_WRITING`].
const MARKER_VALID: u32 = 0xA55A_5A00;

const SLOT_COUNT: u8 = SLOTS_PER_REGION as u8;

/// `a` is strictly newer than `b` under wrapping sequence arithmetic.
fn seq_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

pub(crate) struct SectorJournal {
    region: &'static Region,
    sequence: u32,
    next_slot: u8,
}

pub(crate) struct Recovery {
    pub(crate) journal: SectorJournal,
    pub(crate) record: Option<[u8; MAX_RECORD_LEN]>,
}

impl SectorJournal {
    /// A journal for a region with no usable generation.
    pub(crate) fn empty(region: &'static Region) -> Self {
        Self {
            region,
            sequence: 0,
            next_slot: 0,
        }
    }

    /// Scans both generation slots and loads the newest valid one.
    ///
    /// Two valid generations are normal with lazy reclamation; the higher
    /// sequence wins. No valid generation means the region is uninitialized.
    pub(crate) fn recover<F: SpiFlash>(
        flash: &mut F,
        region: &'static Region,
    ) -> Result<Recovery, FlashError> {
        let mut current: Option<(u8, u32)> = None;

        for slot in 0..SLOT_COUNT {
            let mut header = [0u8; SLOT_HEADER_LEN];
            flash.read(region.slot_addr(slot), &mut header)?;
            let marker = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            if marker != MARKER_VALID {
                continue;
            }
            let sequence = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            match current {
                Some((_, newest)) if !seq_newer(sequence, newest) => {}
                _ => current = Some((slot, sequence)),
            }
        }

        match current {
            Some((slot, sequence)) => {
                let mut record = [0u8; MAX_RECORD_LEN];
                flash.read(
                    region.slot_addr(slot) + SLOT_HEADER_LEN as u32,
                    &mut record[..region.record_len],
                )?;
                Ok(Recovery {
                    journal: Self {
                        region,
                        sequence,
                        next_slot: slot ^ 1,
                    },
                    record: Some(record),
                })
            }
            None => Ok(Recovery {
                journal: Self::empty(region),
                record: None,
            }),
        }
    }

    pub(crate) fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Commits `record` as a new generation in the inactive slot.
    ///
    /// The superseded generation stays in place until this slot cycles back;
    /// recovery resolves the pair by sequence.
    pub(crate) fn commit<F: SpiFlash>(
        &mut self,
        flash: &mut F,
        record: &[u8],
    ) -> Result<(), FlashError> {
        debug_assert_eq!(record.len(), self.region.record_len);

        let slot = self.next_slot;
        let addr = self.region.slot_addr(slot);
        let sequence = self.sequence.wrapping_add(1);

        flash.erase_sector(addr)?;
        flash.program(addr, &MARKER_WRITING.to_le_bytes())?;
        flash.program(addr + SLOT_HEADER_LEN as u32, record)?;
        flash.program(addr + 4, &sequence.to_le_bytes())?;
        flash.program(addr, &MARKER_VALID.to_le_bytes())?;

        self.sequence = sequence;
        self.next_slot = slot ^ 1;
        Ok(())
    }
}
