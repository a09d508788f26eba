//! Flash-resident configuration store.
//!
//! [`SpiFlashStore`] owns the flash device and keeps one in-RAM mirror per
//! region, equal to the last committed record. Reads never touch flash;
//! writes compare against the mirror first and only journal a new generation
//! when the content actually changed.
//!
//! Construct the engine once during bring-up and pass it by reference to the
//! typed façades in [`crate::params`]. All operations are synchronous and
//! block for the duration of any erase/program cycle they trigger, so keep
//! them out of latency-sensitive paths such as the DMX refresh.

mod journal;
mod layout;

pub use layout::{MAX_RECORD_LEN, PARTITION_LEN, REGIONS, Region, StoreId};

use bytemuck::Pod;

use crate::flash::{FlashError, SpiFlash};
use crate::params::{self, FieldDescriptor};
use journal::SectorJournal;
use layout::STORE_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The store id has no registered region.
    NotFound,
    /// Caller buffer size differs from the registered record size.
    SizeMismatch,
    /// Field offset/length exceeds the record bounds.
    OutOfRange,
    /// Erase/program/verify failure at the hardware layer.
    Flash(FlashError),
    /// No generation is valid and no compiled default exists.
    Corrupted,
}

impl From<FlashError> for StoreError {
    fn from(err: FlashError) -> Self {
        StoreError::Flash(err)
    }
}

struct RegionState {
    journal: SectorJournal,
    mirror: [u8; MAX_RECORD_LEN],
    /// Mirror holds real content: a recovered generation or compiled defaults.
    usable: bool,
}

pub struct SpiFlashStore<F> {
    flash: F,
    regions: [RegionState; STORE_COUNT],
}

impl<F: SpiFlash> SpiFlashStore<F> {
    /// Builds the engine and loads every region mirror from flash.
    ///
    /// Never fails: a region that cannot be read, or holds no valid
    /// generation, falls back to its compiled defaults so the node always
    /// comes up.
    pub fn new(mut flash: F) -> Self {
        let regions = core::array::from_fn(|i| {
            let region = &REGIONS[i];
            let (journal, record) = match SectorJournal::recover(&mut flash, region) {
                Ok(recovery) => (recovery.journal, recovery.record),
                Err(err) => {
                    log::warn!("store: {:?} recovery failed: {:?}", region.id, err);
                    (SectorJournal::empty(region), None)
                }
            };

            let mut mirror = [0u8; MAX_RECORD_LEN];
            let usable = match record {
                Some(bytes) => {
                    mirror = bytes;
                    log::debug!(
                        "store: {:?} restored generation {}",
                        region.id,
                        journal.sequence()
                    );
                    true
                }
                None => {
                    let seeded =
                        params::compiled_default(region.id, &mut mirror[..region.record_len]);
                    if seeded {
                        log::info!("store: {:?} uninitialized, using defaults", region.id);
                    } else {
                        log::warn!("store: {:?} uninitialized and has no defaults", region.id);
                    }
                    seeded
                }
            };

            RegionState {
                journal,
                mirror,
                usable,
            }
        });

        Self { flash, regions }
    }

    /// Copies the current record for `id` into `dst`.
    ///
    /// Pure read from the mirror; never touches flash.
    pub fn copy(&self, id: StoreId, dst: &mut [u8]) -> Result<(), StoreError> {
        let region = Region::for_id(id).ok_or(StoreError::NotFound)?;
        if dst.len() != region.record_len {
            return Err(StoreError::SizeMismatch);
        }
        let state = &self.regions[id.index()];
        if !state.usable {
            return Err(StoreError::Corrupted);
        }
        dst.copy_from_slice(&state.mirror[..region.record_len]);
        Ok(())
    }

    /// Replaces the whole record for `id`.
    ///
    /// Unchanged content is not rewritten, so repeated saves of the same
    /// record cost no erase cycle. The mirror is updated only after the
    /// journal commit succeeds.
    pub fn update(&mut self, id: StoreId, src: &[u8]) -> Result<(), StoreError> {
        let region = Region::for_id(id).ok_or(StoreError::NotFound)?;
        if src.len() != region.record_len {
            return Err(StoreError::SizeMismatch);
        }
        let state = &mut self.regions[id.index()];
        if state.usable && src == &state.mirror[..region.record_len] {
            log::debug!("store: {:?} unchanged, write suppressed", id);
            return Ok(());
        }

        state.journal.commit(&mut self.flash, src)?;
        state.mirror[..region.record_len].copy_from_slice(src);
        state.usable = true;
        log::debug!(
            "store: {:?} committed generation {}",
            id,
            state.journal.sequence()
        );
        Ok(())
    }

    /// Patches `[offset, offset + field.len())` of the record and sets
    /// `mask_bit` in the record's override mask.
    ///
    /// Erase granularity forces a whole-region rewrite even for one field;
    /// the optimization is in the decision to write, so an unchanged field
    /// with its mask bit already set costs nothing.
    pub fn update_field(
        &mut self,
        id: StoreId,
        offset: usize,
        field: &[u8],
        mask_bit: u32,
    ) -> Result<(), StoreError> {
        let region = Region::for_id(id).ok_or(StoreError::NotFound)?;
        let end = offset
            .checked_add(field.len())
            .ok_or(StoreError::OutOfRange)?;
        if end > region.record_len {
            return Err(StoreError::OutOfRange);
        }
        let state = &mut self.regions[id.index()];
        if !state.usable {
            return Err(StoreError::Corrupted);
        }

        let mut working = state.mirror;
        working[offset..end].copy_from_slice(field);
        let mask =
            u32::from_le_bytes([working[0], working[1], working[2], working[3]]) | mask_bit;
        working[..4].copy_from_slice(&mask.to_le_bytes());

        if working[..region.record_len] == state.mirror[..region.record_len] {
            log::debug!("store: {:?} field at {} unchanged, write suppressed", id, offset);
            return Ok(());
        }

        state
            .journal
            .commit(&mut self.flash, &working[..region.record_len])?;
        state.mirror = working;
        log::debug!(
            "store: {:?} field at {} committed generation {}",
            id,
            offset,
            state.journal.sequence()
        );
        Ok(())
    }

    /// Reads the record for `id` as a typed value.
    pub fn load_record<T: Pod>(&self, id: StoreId) -> Result<T, StoreError> {
        let mut value = T::zeroed();
        self.copy(id, bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }

    pub fn save_record<T: Pod>(&mut self, id: StoreId, record: &T) -> Result<(), StoreError> {
        self.update(id, bytemuck::bytes_of(record))
    }

    /// Persists a single field through its descriptor.
    pub fn save_field<T: Pod>(
        &mut self,
        id: StoreId,
        field: &FieldDescriptor,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = bytemuck::bytes_of(value);
        if bytes.len() != field.len {
            return Err(StoreError::SizeMismatch);
        }
        self.update_field(id, field.offset, bytes, field.mask)
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::sim::SimFlash;
    use crate::params::NetworkParams;
    use crate::params::network::{MASK_IP, MASK_NETMASK};

    type TestFlash = SimFlash<{ PARTITION_LEN as usize }>;

    fn store() -> SpiFlashStore<TestFlash> {
        SpiFlashStore::new(TestFlash::new())
    }

    fn network_record(mask: u32, ip: [u8; 4], netmask: [u8; 4], gateway: [u8; 4]) -> [u8; 16] {
        let mut record = [0u8; 16];
        record[..4].copy_from_slice(&mask.to_le_bytes());
        record[4..8].copy_from_slice(&ip);
        record[8..12].copy_from_slice(&netmask);
        record[12..16].copy_from_slice(&gateway);
        record
    }

    #[test]
    fn first_boot_yields_compiled_defaults_without_writing() {
        let store = store();
        let mut record = [0xAAu8; 16];
        store.copy(StoreId::Network, &mut record).unwrap();
        assert_eq!(&record[..], bytemuck::bytes_of(&NetworkParams::default()));
        assert_eq!(store.flash().erase_ops, 0);
        assert_eq!(store.flash().program_ops, 0);
    }

    #[test]
    fn update_then_copy_round_trips() {
        let mut store = store();
        let record = network_record(MASK_IP, [10, 0, 0, 5], [255, 0, 0, 0], [10, 0, 0, 1]);
        store.update(StoreId::Network, &record).unwrap();

        let mut read = [0u8; 16];
        store.copy(StoreId::Network, &mut read).unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn identical_update_is_suppressed() {
        let mut store = store();
        let record = network_record(MASK_IP, [10, 0, 0, 5], [255, 0, 0, 0], [10, 0, 0, 1]);

        store.update(StoreId::Network, &record).unwrap();
        let erases = store.flash().erase_ops;
        let programs = store.flash().program_ops;
        assert_eq!(erases, 1);

        store.update(StoreId::Network, &record).unwrap();
        assert_eq!(store.flash().erase_ops, erases);
        assert_eq!(store.flash().program_ops, programs);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut store = store();
        let mut short = [0u8; 8];
        assert_eq!(
            store.copy(StoreId::Network, &mut short),
            Err(StoreError::SizeMismatch)
        );
        assert_eq!(
            store.update(StoreId::Network, &short),
            Err(StoreError::SizeMismatch)
        );
    }

    #[test]
    fn field_beyond_record_is_rejected() {
        let mut store = store();
        assert_eq!(
            store.update_field(StoreId::Network, 14, &[1, 2, 3, 4], MASK_IP),
            Err(StoreError::OutOfRange)
        );
        assert_eq!(
            store.update_field(StoreId::Network, usize::MAX, &[1], MASK_IP),
            Err(StoreError::OutOfRange)
        );
    }

    #[test]
    fn update_field_touches_only_the_field_and_the_mask() {
        let mut store = store();
        let before = network_record(
            MASK_IP | MASK_NETMASK,
            [192, 168, 0, 20],
            [255, 255, 255, 0],
            [192, 168, 0, 1],
        );
        store.update(StoreId::Network, &before).unwrap();

        store
            .update_field(StoreId::Network, 4, &[10, 0, 0, 5], MASK_IP)
            .unwrap();

        let mut after = [0u8; 16];
        store.copy(StoreId::Network, &mut after).unwrap();
        assert_eq!(after[4..8], [10, 0, 0, 5]);
        // Mask bit was already set, so the leading word is untouched.
        assert_eq!(after[..4], before[..4]);
        assert_eq!(after[8..], before[8..]);
    }

    #[test]
    fn update_field_sets_the_mask_bit() {
        let mut store = store();
        let before = network_record(0, [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]);
        store.update(StoreId::Network, &before).unwrap();

        store
            .update_field(StoreId::Network, 4, &[10, 0, 0, 5], MASK_IP)
            .unwrap();

        let mut after = [0u8; 16];
        store.copy(StoreId::Network, &mut after).unwrap();
        let mask = u32::from_le_bytes([after[0], after[1], after[2], after[3]]);
        assert_eq!(mask, MASK_IP);
        assert_eq!(after[4..8], [10, 0, 0, 5]);
        assert_eq!(after[8..], before[8..]);
    }

    #[test]
    fn unchanged_field_with_mask_set_is_suppressed() {
        let mut store = store();
        let record = network_record(MASK_IP, [10, 0, 0, 5], [0, 0, 0, 0], [0, 0, 0, 0]);
        store.update(StoreId::Network, &record).unwrap();
        let erases = store.flash().erase_ops;

        store
            .update_field(StoreId::Network, 4, &[10, 0, 0, 5], MASK_IP)
            .unwrap();
        assert_eq!(store.flash().erase_ops, erases);
    }

    #[test]
    fn reboot_restores_the_committed_record() {
        let mut store = store();
        let record = network_record(MASK_IP, [10, 0, 0, 5], [255, 0, 0, 0], [10, 0, 0, 1]);
        store.update(StoreId::Network, &record).unwrap();

        let memory = *store.into_flash().memory();
        let rebooted = SpiFlashStore::new(TestFlash::from_memory(memory));
        let mut read = [0u8; 16];
        rebooted.copy(StoreId::Network, &mut read).unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn newest_generation_wins_and_the_old_one_lingers() {
        let mut store = store();
        let first = network_record(MASK_IP, [10, 0, 0, 1], [0, 0, 0, 0], [0, 0, 0, 0]);
        let second = network_record(MASK_IP, [10, 0, 0, 2], [0, 0, 0, 0], [0, 0, 0, 0]);
        store.update(StoreId::Network, &first).unwrap();
        store.update(StoreId::Network, &second).unwrap();

        // Lazy reclamation: the superseded generation is still marked valid.
        let memory = *store.flash().memory();
        let slot0_marker = u32::from_le_bytes([memory[0], memory[1], memory[2], memory[3]]);
        let slot1 = 4096;
        let slot1_marker = u32::from_le_bytes([
            memory[slot1],
            memory[slot1 + 1],
            memory[slot1 + 2],
            memory[slot1 + 3],
        ]);
        assert_eq!(slot0_marker, slot1_marker);

        let rebooted = SpiFlashStore::new(TestFlash::from_memory(memory));
        let mut read = [0u8; 16];
        rebooted.copy(StoreId::Network, &mut read).unwrap();
        assert_eq!(read, second);
    }

    #[test]
    fn regions_are_independent() {
        let mut store = store();
        let record = network_record(MASK_IP, [10, 0, 0, 5], [255, 0, 0, 0], [10, 0, 0, 1]);
        store.update(StoreId::Network, &record).unwrap();

        let mut dmx = [0u8; 8];
        store.copy(StoreId::DmxSend, &mut dmx).unwrap();
        store.update(StoreId::DmxSend, &[0, 0, 0, 0, 200, 16, 30, 0]).unwrap();

        let mut read = [0u8; 16];
        store.copy(StoreId::Network, &mut read).unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn typed_round_trip_through_pod_helpers() {
        let mut store = store();
        let mut params = NetworkParams::default();
        params.local_ip = [172, 16, 4, 40];
        params.set_mask |= MASK_IP;
        store.save_record(StoreId::Network, &params).unwrap();

        let read: NetworkParams = store.load_record(StoreId::Network).unwrap();
        assert_eq!(read, params);
    }
}
