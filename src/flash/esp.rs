//! ESP32 binding for the store partition.
//!
//! Wraps [`esp_storage::FlashStorage`] and confines the store to its own
//! partition. Erase and program run with the caller blocked; while they are in
//! flight, execute-in-place reads from the same flash are undefined, so the
//! main loop must not let ISR-level code touch flash during a store call.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_storage::FlashStorage;

use super::{FlashError, SECTOR_SIZE, SpiFlash, program_allowed};

/// Base address of the `node_config` partition (defined in partitions.csv).
const STORE_PARTITION_OFFSET: u32 = 0x3D_0000;

const CHUNK: usize = 64;

pub struct EspStoreFlash {
    flash: FlashStorage<'static>,
    base: u32,
    capacity: u32,
}

impl EspStoreFlash {
    /// Binds `capacity` bytes of the store partition.
    pub fn new(flash: FlashStorage<'static>, capacity: u32) -> Self {
        Self {
            flash,
            base: STORE_PARTITION_OFFSET,
            capacity,
        }
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), FlashError> {
        match addr.checked_add(len as u32) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(FlashError::OutOfBounds),
        }
    }
}

impl SpiFlash for EspStoreFlash {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_range(addr, buf.len())?;
        self.flash
            .read(self.base + addr, buf)
            .map_err(|_| FlashError::Io)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashError> {
        debug_assert_eq!(addr % SECTOR_SIZE, 0, "erase address must be sector aligned");
        self.check_range(addr, SECTOR_SIZE as usize)?;
        let start = self.base + addr;
        self.flash
            .erase(start, start + SECTOR_SIZE)
            .map_err(|_| FlashError::Io)
    }

    fn program(&mut self, addr: u32, bytes: &[u8]) -> Result<(), FlashError> {
        self.check_range(addr, bytes.len())?;

        let mut scratch = [0u8; CHUNK];
        for (i, chunk) in bytes.chunks(CHUNK).enumerate() {
            let offset = addr + (i * CHUNK) as u32;
            let existing = &mut scratch[..chunk.len()];
            self.flash
                .read(self.base + offset, existing)
                .map_err(|_| FlashError::Io)?;
            if !program_allowed(existing, chunk) {
                return Err(FlashError::NotErased);
            }
        }

        self.flash
            .write(self.base + addr, bytes)
            .map_err(|_| FlashError::Io)?;

        // Verify after write.
        for (i, chunk) in bytes.chunks(CHUNK).enumerate() {
            let offset = addr + (i * CHUNK) as u32;
            let readback = &mut scratch[..chunk.len()];
            self.flash
                .read(self.base + offset, readback)
                .map_err(|_| FlashError::Io)?;
            if readback != chunk {
                return Err(FlashError::Io);
            }
        }
        Ok(())
    }
}
