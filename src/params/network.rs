//! Network identity parameters and their store façade.

use core::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use super::FieldDescriptor;
use crate::flash::SpiFlash;
use crate::properties;
use crate::store::{SpiFlashStore, StoreError, StoreId};

/// Operator configured a static address.
pub const MASK_IP: u32 = 1 << 0;
pub const MASK_NETMASK: u32 = 1 << 1;
pub const MASK_GATEWAY: u32 = 1 << 2;

/// Network identity record, mirrored into the NETWORK region.
///
/// The node runs DHCP until an operator explicitly configures an address, so
/// there is no separate DHCP flag: `MASK_IP` clear means DHCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct NetworkParams {
    pub set_mask: u32,
    pub local_ip: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
}

impl NetworkParams {
    pub const FIELD_LOCAL_IP: FieldDescriptor = FieldDescriptor {
        name: "ip_address",
        offset: offset_of!(NetworkParams, local_ip),
        len: 4,
        mask: MASK_IP,
    };
    pub const FIELD_NETMASK: FieldDescriptor = FieldDescriptor {
        name: "net_mask",
        offset: offset_of!(NetworkParams, netmask),
        len: 4,
        mask: MASK_NETMASK,
    };
    pub const FIELD_GATEWAY: FieldDescriptor = FieldDescriptor {
        name: "default_gateway",
        offset: offset_of!(NetworkParams, gateway),
        len: 4,
        mask: MASK_GATEWAY,
    };

    pub const FIELDS: [FieldDescriptor; 3] = [
        Self::FIELD_LOCAL_IP,
        Self::FIELD_NETMASK,
        Self::FIELD_GATEWAY,
    ];

    pub fn use_dhcp(&self) -> bool {
        self.set_mask & MASK_IP == 0
    }

    /// Applies one `key=value` config line; unknown keys are left alone.
    pub fn parse_line(&mut self, line: &str) {
        if let Ok(ip) = properties::scan_ip4(line, "ip_address") {
            self.local_ip = ip;
            self.set_mask |= MASK_IP;
        } else if let Ok(netmask) = properties::scan_ip4(line, "net_mask") {
            self.netmask = netmask;
            self.set_mask |= MASK_NETMASK;
        } else if let Ok(gateway) = properties::scan_ip4(line, "default_gateway") {
            self.gateway = gateway;
            self.set_mask |= MASK_GATEWAY;
        } else if let Ok(dhcp) = properties::scan_bool(line, "use_dhcp") {
            if dhcp {
                self.set_mask &= !MASK_IP;
            }
        }
    }

    pub fn parse(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            set_mask: 0,
            local_ip: [0; 4],
            netmask: [0; 4],
            gateway: [0; 4],
        }
    }
}

/// Flash store façade for the NETWORK region.
pub trait NetworkStore {
    fn network_params(&self) -> Result<NetworkParams, StoreError>;
    fn save_network_params(&mut self, params: &NetworkParams) -> Result<(), StoreError>;
    fn set_local_ip(&mut self, ip: [u8; 4]) -> Result<(), StoreError>;
    fn set_netmask(&mut self, netmask: [u8; 4]) -> Result<(), StoreError>;
    fn set_gateway(&mut self, gateway: [u8; 4]) -> Result<(), StoreError>;
}

impl<F: SpiFlash> NetworkStore for SpiFlashStore<F> {
    fn network_params(&self) -> Result<NetworkParams, StoreError> {
        self.load_record(StoreId::Network)
    }

    fn save_network_params(&mut self, params: &NetworkParams) -> Result<(), StoreError> {
        self.save_record(StoreId::Network, params)
    }

    fn set_local_ip(&mut self, ip: [u8; 4]) -> Result<(), StoreError> {
        self.save_field(StoreId::Network, &NetworkParams::FIELD_LOCAL_IP, &ip)
    }

    fn set_netmask(&mut self, netmask: [u8; 4]) -> Result<(), StoreError> {
        self.save_field(StoreId::Network, &NetworkParams::FIELD_NETMASK, &netmask)
    }

    fn set_gateway(&mut self, gateway: [u8; 4]) -> Result<(), StoreError> {
        self.save_field(StoreId::Network, &NetworkParams::FIELD_GATEWAY, &gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_matches_the_region() {
        assert_eq!(core::mem::size_of::<NetworkParams>(), 16);
        assert_eq!(offset_of!(NetworkParams, set_mask), 0);
        assert_eq!(NetworkParams::FIELD_LOCAL_IP.offset, 4);
        assert_eq!(NetworkParams::FIELD_NETMASK.offset, 8);
        assert_eq!(NetworkParams::FIELD_GATEWAY.offset, 12);
        for field in &NetworkParams::FIELDS {
            assert_eq!(field.len, 4);
        }
    }

    #[test]
    fn parse_sets_fields_and_mask_bits() {
        let mut params = NetworkParams::default();
        params.parse("ip_address=192.168.2.10\nnet_mask=255.255.255.0\n");
        assert_eq!(params.local_ip, [192, 168, 2, 10]);
        assert_eq!(params.netmask, [255, 255, 255, 0]);
        assert_eq!(params.set_mask, MASK_IP | MASK_NETMASK);
        assert!(!params.use_dhcp());
    }

    #[test]
    fn dhcp_request_clears_the_static_address() {
        let mut params = NetworkParams::default();
        params.parse_line("ip_address=192.168.2.10");
        params.parse_line("use_dhcp=1");
        assert!(params.use_dhcp());
    }

    #[test]
    fn unknown_lines_change_nothing() {
        let mut params = NetworkParams::default();
        params.parse_line("hostname=node-1");
        params.parse_line("# comment");
        assert_eq!(params, NetworkParams::default());
    }
}
