//! Persistent configuration store for Art-Net / sACN DMX bridge nodes.
//!
//! The node keeps its user-configurable parameters (network identity, DMX
//! timing, protocol options) in a dedicated SPI flash partition with no
//! filesystem underneath. [`store::SpiFlashStore`] journals every record
//! across two generation slots per region so a power cut at any byte leaves
//! either the old or the new record intact, never a mixture.
//!
//! Typical bring-up: construct the engine from the flash device, then hand it
//! by reference to the typed per-domain façades in [`params`].

#![cfg_attr(not(test), no_std)]

pub mod flash;
pub mod params;
pub mod properties;
pub mod store;
