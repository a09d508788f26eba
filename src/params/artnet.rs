//! Art-Net node parameters and their store façade.

use core::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use super::{FieldDescriptor, copy_padded, padded_str};
use crate::flash::SpiFlash;
use crate::properties;
use crate::store::{SpiFlashStore, StoreError, StoreId};

pub const MASK_NET: u32 = 1 << 0;
pub const MASK_SUBNET: u32 = 1 << 1;
pub const MASK_UNIVERSE: u32 = 1 << 2;
pub const MASK_OUTPUT: u32 = 1 << 3;
pub const MASK_RDM: u32 = 1 << 4;
pub const MASK_TIMECODE: u32 = 1 << 5;
pub const MASK_TIMESYNC: u32 = 1 << 6;
pub const MASK_SHORT_NAME: u32 = 1 << 7;
pub const MASK_LONG_NAME: u32 = 1 << 8;

pub const SHORT_NAME_LEN: usize = 18;
pub const LONG_NAME_LEN: usize = 64;

/// Where the node routes received DMX data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputType {
    Dmx = 0,
    Spi = 1,
}

impl OutputType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OutputType::Dmx),
            1 => Some(OutputType::Spi),
            _ => None,
        }
    }
}

/// Art-Net node record, mirrored into the ARTNET region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ArtNetParams {
    pub set_mask: u32,
    pub net: u8,
    pub sub_net: u8,
    pub universe: u8,
    pub output: u8,
    pub rdm: u8,
    pub use_timecode: u8,
    pub use_timesync: u8,
    _padding: u8,
    pub short_name: [u8; SHORT_NAME_LEN],
    pub long_name: [u8; LONG_NAME_LEN],
    _padding2: [u8; 2],
}

impl ArtNetParams {
    pub const FIELD_NET: FieldDescriptor = FieldDescriptor {
        name: "net",
        offset: offset_of!(ArtNetParams, net),
        len: 1,
        mask: MASK_NET,
    };
    pub const FIELD_SUBNET: FieldDescriptor = FieldDescriptor {
        name: "subnet",
        offset: offset_of!(ArtNetParams, sub_net),
        len: 1,
        mask: MASK_SUBNET,
    };
    pub const FIELD_UNIVERSE: FieldDescriptor = FieldDescriptor {
        name: "universe",
        offset: offset_of!(ArtNetParams, universe),
        len: 1,
        mask: MASK_UNIVERSE,
    };
    pub const FIELD_OUTPUT: FieldDescriptor = FieldDescriptor {
        name: "output",
        offset: offset_of!(ArtNetParams, output),
        len: 1,
        mask: MASK_OUTPUT,
    };
    pub const FIELD_RDM: FieldDescriptor = FieldDescriptor {
        name: "enable_rdm",
        offset: offset_of!(ArtNetParams, rdm),
        len: 1,
        mask: MASK_RDM,
    };
    pub const FIELD_SHORT_NAME: FieldDescriptor = FieldDescriptor {
        name: "short_name",
        offset: offset_of!(ArtNetParams, short_name),
        len: SHORT_NAME_LEN,
        mask: MASK_SHORT_NAME,
    };
    pub const FIELD_LONG_NAME: FieldDescriptor = FieldDescriptor {
        name: "long_name",
        offset: offset_of!(ArtNetParams, long_name),
        len: LONG_NAME_LEN,
        mask: MASK_LONG_NAME,
    };

    pub const FIELDS: [FieldDescriptor; 7] = [
        Self::FIELD_NET,
        Self::FIELD_SUBNET,
        Self::FIELD_UNIVERSE,
        Self::FIELD_OUTPUT,
        Self::FIELD_RDM,
        Self::FIELD_SHORT_NAME,
        Self::FIELD_LONG_NAME,
    ];

    pub fn output_type(&self) -> OutputType {
        OutputType::from_u8(self.output).unwrap_or(OutputType::Dmx)
    }

    pub fn short_name_str(&self) -> &str {
        padded_str(&self.short_name)
    }

    pub fn long_name_str(&self) -> &str {
        padded_str(&self.long_name)
    }

    /// Applies one `key=value` config line; unknown keys are left alone.
    pub fn parse_line(&mut self, line: &str) {
        if let Ok(net) = properties::scan_u8(line, "net") {
            self.net = net;
            self.set_mask |= MASK_NET;
        } else if let Ok(sub_net) = properties::scan_u8(line, "subnet") {
            self.sub_net = sub_net;
            self.set_mask |= MASK_SUBNET;
        } else if let Ok(universe) = properties::scan_u8(line, "universe") {
            self.universe = universe;
            self.set_mask |= MASK_UNIVERSE;
        } else if let Ok(output) = properties::scan(line, "output") {
            match output {
                "dmx" => {
                    self.output = OutputType::Dmx as u8;
                    self.set_mask |= MASK_OUTPUT;
                }
                "spi" => {
                    self.output = OutputType::Spi as u8;
                    self.set_mask |= MASK_OUTPUT;
                }
                _ => {}
            }
        } else if let Ok(rdm) = properties::scan_bool(line, "enable_rdm") {
            self.rdm = u8::from(rdm);
            self.set_mask |= MASK_RDM;
        } else if let Ok(timecode) = properties::scan_bool(line, "use_timecode") {
            self.use_timecode = u8::from(timecode);
            self.set_mask |= MASK_TIMECODE;
        } else if let Ok(timesync) = properties::scan_bool(line, "use_timesync") {
            self.use_timesync = u8::from(timesync);
            self.set_mask |= MASK_TIMESYNC;
        } else if let Ok(name) = properties::scan_str::<SHORT_NAME_LEN>(line, "short_name") {
            copy_padded(&mut self.short_name, name.as_str());
            self.set_mask |= MASK_SHORT_NAME;
        } else if let Ok(name) = properties::scan_str::<LONG_NAME_LEN>(line, "long_name") {
            copy_padded(&mut self.long_name, name.as_str());
            self.set_mask |= MASK_LONG_NAME;
        }
    }

    pub fn parse(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }
}

impl Default for ArtNetParams {
    fn default() -> Self {
        let mut params = Self {
            set_mask: 0,
            net: 0,
            sub_net: 0,
            universe: 1,
            output: OutputType::Dmx as u8,
            rdm: 0,
            use_timecode: 0,
            use_timesync: 0,
            _padding: 0,
            short_name: [0; SHORT_NAME_LEN],
            long_name: [0; LONG_NAME_LEN],
            _padding2: [0; 2],
        };
        copy_padded(&mut params.short_name, "Art-Net Node");
        copy_padded(&mut params.long_name, "Art-Net 3 DMX/Pixel bridge");
        params
    }
}

/// Flash store façade for the ARTNET region.
pub trait ArtNetStore {
    fn artnet_params(&self) -> Result<ArtNetParams, StoreError>;
    fn save_artnet_params(&mut self, params: &ArtNetParams) -> Result<(), StoreError>;
    fn set_net(&mut self, net: u8) -> Result<(), StoreError>;
    fn set_sub_net(&mut self, sub_net: u8) -> Result<(), StoreError>;
    fn set_artnet_universe(&mut self, universe: u8) -> Result<(), StoreError>;
    fn set_output_type(&mut self, output: OutputType) -> Result<(), StoreError>;
    fn set_rdm(&mut self, enabled: bool) -> Result<(), StoreError>;
    fn set_short_name(&mut self, name: &str) -> Result<(), StoreError>;
    fn set_long_name(&mut self, name: &str) -> Result<(), StoreError>;
}

impl<F: SpiFlash> ArtNetStore for SpiFlashStore<F> {
    fn artnet_params(&self) -> Result<ArtNetParams, StoreError> {
        self.load_record(StoreId::ArtNet)
    }

    fn save_artnet_params(&mut self, params: &ArtNetParams) -> Result<(), StoreError> {
        self.save_record(StoreId::ArtNet, params)
    }

    fn set_net(&mut self, net: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_NET, &net)
    }

    fn set_sub_net(&mut self, sub_net: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_SUBNET, &sub_net)
    }

    fn set_artnet_universe(&mut self, universe: u8) -> Result<(), StoreError> {
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_UNIVERSE, &universe)
    }

    fn set_output_type(&mut self, output: OutputType) -> Result<(), StoreError> {
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_OUTPUT, &(output as u8))
    }

    fn set_rdm(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_RDM, &u8::from(enabled))
    }

    fn set_short_name(&mut self, name: &str) -> Result<(), StoreError> {
        let mut field = [0u8; SHORT_NAME_LEN];
        copy_padded(&mut field, name);
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_SHORT_NAME, &field)
    }

    fn set_long_name(&mut self, name: &str) -> Result<(), StoreError> {
        let mut field = [0u8; LONG_NAME_LEN];
        copy_padded(&mut field, name);
        self.save_field(StoreId::ArtNet, &ArtNetParams::FIELD_LONG_NAME, &field)
    }
}
