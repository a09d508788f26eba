//! Typed configuration domains stored by the engine.
//!
//! Every persisted record is `#[repr(C)]` with explicit padding, starts with
//! its `set_mask` override mask and mirrors into its flash region byte for
//! byte. Each domain ships a descriptor table for its independently
//! persistable fields, compiled defaults, a text-config loader and a store
//! façade trait implemented on [`crate::store::SpiFlashStore`].

pub mod artnet;
pub mod dmxsend;
pub mod e131;
pub mod network;
pub mod pixel;

pub use artnet::{ArtNetParams, ArtNetStore, OutputType};
pub use dmxsend::{DmxSendParams, DmxSendStore};
pub use e131::{E131Params, E131Store, MergeMode};
pub use network::{NetworkParams, NetworkStore};
pub use pixel::{LedType, PixelParams, PixelStore};

use bytemuck::Pod;

use crate::store::StoreId;

/// Statically known address of one independently persistable field.
///
/// Offsets come from `offset_of!` on the record type, so they stay correct
/// under layout review instead of relying on pointer arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    /// Override-mask bit marking the field as operator-configured.
    pub mask: u32,
}

/// Writes the compiled default record for `id` into `out`.
///
/// Returns false for a domain without defaults; every shipped domain has
/// them, which keeps first boot and corrupted regions non-fatal.
pub(crate) fn compiled_default(id: StoreId, out: &mut [u8]) -> bool {
    match id {
        StoreId::Network => write_default::<NetworkParams>(out),
        StoreId::ArtNet => write_default::<ArtNetParams>(out),
        StoreId::DmxSend => write_default::<DmxSendParams>(out),
        StoreId::E131 => write_default::<E131Params>(out),
        StoreId::Pixel => write_default::<PixelParams>(out),
    }
    true
}

fn write_default<T: Pod + Default>(out: &mut [u8]) {
    out.copy_from_slice(bytemuck::bytes_of(&T::default()));
}

/// Copies `src` into a fixed-size name field, zero padded, truncating at the
/// field size.
pub(crate) fn copy_padded(dst: &mut [u8], src: &str) {
    dst.fill(0);
    let bytes = src.as_bytes();
    let len = bytes.len().min(dst.len());
    dst[..len].copy_from_slice(&bytes[..len]);
}

/// Reads a zero-padded name field back as a string slice.
pub(crate) fn padded_str(bytes: &[u8]) -> &str {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..len]).unwrap_or("")
}
