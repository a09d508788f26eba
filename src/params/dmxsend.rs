//! DMX output timing parameters and their store façade.

use core::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use super::FieldDescriptor;
use crate::flash::SpiFlash;
use crate::properties;
use crate::store::{SpiFlashStore, StoreError, StoreId};

pub const MASK_BREAK_TIME: u32 = 1 << 0;
pub const MASK_MAB_TIME: u32 = 1 << 1;
pub const MASK_REFRESH_RATE: u32 = 1 << 2;

/// DMX send record, mirrored into the DMXSEND region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DmxSendParams {
    pub set_mask: u32,
    /// Break duration in microseconds.
    pub break_time: u8,
    /// Mark-after-break duration in microseconds.
    pub mab_time: u8,
    /// Frames per second; 0 sends as fast as the line allows.
    pub refresh_rate: u8,
    _padding: u8,
}

impl DmxSendParams {
    pub const FIELD_BREAK_TIME: FieldDescriptor = FieldDescriptor {
        name: "dmx_break_time",
        offset: offset_of!(DmxSendParams, break_time),
        len: 1,
        mask: MASK_BREAK_TIME,
    };
    pub const FIELD_MAB_TIME: FieldDescriptor = FieldDescriptor {
        name: "dmx_mab_time",
        offset: offset_of!(DmxSendParams, mab_time),
        len: 1,
        mask: MASK_MAB_TIME,
    };
    pub const FIELD_REFRESH_RATE: FieldDescriptor = FieldDescriptor {
        name: "dmx_refresh_rate",
        offset: offset_of!(DmxSendParams, refresh_rate),
        len: 1,
        mask: MASK_REFRESH_RATE,
    };

    pub const FIELDS: [FieldDescriptor; 3] = [
        Self::FIELD_BREAK_TIME,
        Self::FIELD_MAB_TIME,
        Self::FIELD_REFRESH_RATE,
    ];

    /// Applies one `key=value` config line; unknown keys are left alone.
    pub fn parse_line(&mut self, line: &str) {
        if let Ok(break_time) = properties::scan_u8(line, "dmx_break_time") {
            self.break_time = break_time;
            self.set_mask |= MASK_BREAK_TIME;
        } else if let Ok(mab_time) = properties::scan_u8(line, "dmx_mab_time") {
            self.mab_time = mab_time;
            self.set_mask |= MASK_MAB_TIME;
        } else if let Ok(rate) = properties::scan_u8(line, "dmx_refresh_rate") {
            self.refresh_rate = rate;
            self.set_mask |= MASK_REFRESH_RATE;
        }
    }

    pub fn parse(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }
}

impl Default for DmxSendParams {
    fn default() -> Self {
        Self {
            set_mask: 0,
            break_time: 176,
            mab_time: 12,
            refresh_rate: 40,
            _padding: 0,
        }
    }
}

/// Flash store façade for the DMXSEND region.
pub trait DmxSendStore {
    fn dmx_send_params(&self) -> Result<DmxSendParams, StoreError>;
    fn save_dmx_send_params(&mut self, params: &DmxSendParams) -> Result<(), StoreError>;
    fn set_break_time(&mut self, micros: u8) -> Result<(), StoreError>;
    fn set_mab_time(&mut self, micros: u8) -> Result<(), StoreError>;
    fn set_refresh_rate(&mut self, rate: u8) -> Result<(), StoreError>;
}

impl<F: SpiFlash> DmxSendStore for SpiFlashStore<F> {
    fn dmx_send_params(&self) -> Result<DmxSendParams, StoreError> {
        self.load_record(StoreId::DmxSend)
    }

    fn save_dmx_send_params(&mut self, params: &DmxSendParams) -> Result<(), StoreError> {
        self.save_record(StoreId::DmxSend, params)
    }

    fn set_break_time(&mut self, micros: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::DmxSend, &DmxSendParams::FIELD_BREAK_TIME, &micros)
    }

    fn set_mab_time(&mut self, micros: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::DmxSend, &DmxSendParams::FIELD_MAB_TIME, &micros)
    }

    fn set_refresh_rate(&mut self, rate: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::DmxSend, &DmxSendParams::FIELD_REFRESH_RATE, &rate)
    }
}
