//! sACN (E1.31) parameters and their store façade.

use core::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use super::FieldDescriptor;
use crate::flash::SpiFlash;
use crate::properties;
use crate::store::{SpiFlashStore, StoreError, StoreId};

pub const MASK_UNIVERSE: u32 = 1 << 0;
pub const MASK_MERGE_MODE: u32 = 1 << 1;
pub const MASK_CID: u32 = 1 << 2;

/// How concurrent sources for the same universe are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MergeMode {
    Htp = 0,
    Ltp = 1,
}

impl MergeMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MergeMode::Htp),
            1 => Some(MergeMode::Ltp),
            _ => None,
        }
    }
}

/// E1.31 record, mirrored into the E131 region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct E131Params {
    pub set_mask: u32,
    pub universe: u16,
    pub merge_mode: u8,
    _padding: u8,
    /// sACN component identifier; all zero means derive one from the MAC.
    pub cid: [u8; 16],
    pub have_custom_cid: u8,
    _padding2: [u8; 3],
}

impl E131Params {
    pub const FIELD_UNIVERSE: FieldDescriptor = FieldDescriptor {
        name: "universe",
        offset: offset_of!(E131Params, universe),
        len: 2,
        mask: MASK_UNIVERSE,
    };
    pub const FIELD_MERGE_MODE: FieldDescriptor = FieldDescriptor {
        name: "merge_mode",
        offset: offset_of!(E131Params, merge_mode),
        len: 1,
        mask: MASK_MERGE_MODE,
    };
    pub const FIELD_CID: FieldDescriptor = FieldDescriptor {
        name: "cid",
        offset: offset_of!(E131Params, cid),
        len: 16,
        mask: MASK_CID,
    };

    pub const FIELDS: [FieldDescriptor; 3] = [
        Self::FIELD_UNIVERSE,
        Self::FIELD_MERGE_MODE,
        Self::FIELD_CID,
    ];

    pub fn merge(&self) -> MergeMode {
        MergeMode::from_u8(self.merge_mode).unwrap_or(MergeMode::Htp)
    }

    pub fn has_custom_cid(&self) -> bool {
        self.have_custom_cid != 0
    }

    /// Applies one `key=value` config line; unknown keys are left alone.
    pub fn parse_line(&mut self, line: &str) {
        if let Ok(universe) = properties::scan_u16(line, "universe") {
            self.universe = universe;
            self.set_mask |= MASK_UNIVERSE;
        } else if let Ok(mode) = properties::scan(line, "merge_mode") {
            match mode {
                "htp" => {
                    self.merge_mode = MergeMode::Htp as u8;
                    self.set_mask |= MASK_MERGE_MODE;
                }
                "ltp" => {
                    self.merge_mode = MergeMode::Ltp as u8;
                    self.set_mask |= MASK_MERGE_MODE;
                }
                _ => {}
            }
        } else if let Ok(cid) = properties::scan_cid(line, "cid") {
            self.cid = cid;
            self.have_custom_cid = 1;
            self.set_mask |= MASK_CID;
        }
    }

    pub fn parse(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }
}

impl Default for E131Params {
    fn default() -> Self {
        Self {
            set_mask: 0,
            universe: 1,
            merge_mode: MergeMode::Htp as u8,
            _padding: 0,
            cid: [0; 16],
            have_custom_cid: 0,
            _padding2: [0; 3],
        }
    }
}

/// Flash store façade for the E131 region.
pub trait E131Store {
    fn e131_params(&self) -> Result<E131Params, StoreError>;
    fn save_e131_params(&mut self, params: &E131Params) -> Result<(), StoreError>;
    fn set_e131_universe(&mut self, universe: u16) -> Result<(), StoreError>;
    fn set_merge_mode(&mut self, mode: MergeMode) -> Result<(), StoreError>;
    fn set_cid(&mut self, cid: [u8; 16]) -> Result<(), StoreError>;
}

impl<F: SpiFlash> E131Store for SpiFlashStore<F> {
    fn e131_params(&self) -> Result<E131Params, StoreError> {
        self.load_record(StoreId::E131)
    }

    fn save_e131_params(&mut self, params: &E131Params) -> Result<(), StoreError> {
        self.save_record(StoreId::E131, params)
    }

    fn set_e131_universe(&mut self, universe: u16) -> Result<(), StoreError> {
        self.save_field(StoreId::E131, &E131Params::FIELD_UNIVERSE, &universe)
    }

    fn set_merge_mode(&mut self, mode: MergeMode) -> Result<(), StoreError> {
        self.save_field(StoreId::E131, &E131Params::FIELD_MERGE_MODE, &(mode as u8))
    }

    fn set_cid(&mut self, cid: [u8; 16]) -> Result<(), StoreError> {
        self.save_field(StoreId::E131, &E131Params::FIELD_CID, &cid)
    }
}
