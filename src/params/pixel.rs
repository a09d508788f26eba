//! Pixel string parameters and their store façade.

use core::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use super::FieldDescriptor;
use crate::flash::SpiFlash;
use crate::properties;
use crate::store::{SpiFlashStore, StoreError, StoreId};

pub const MASK_LED_TYPE: u32 = 1 << 0;
pub const MASK_LED_COUNT: u32 = 1 << 1;
pub const MASK_SPI_SPEED: u32 = 1 << 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedType {
    Ws2801 = 0,
    Ws2812 = 1,
    Sk6812 = 2,
    Sk6812W = 3,
}

impl LedType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LedType::Ws2801),
            1 => Some(LedType::Ws2812),
            2 => Some(LedType::Sk6812),
            3 => Some(LedType::Sk6812W),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ws2801" => Some(LedType::Ws2801),
            "ws2812" => Some(LedType::Ws2812),
            "sk6812" => Some(LedType::Sk6812),
            "sk6812w" => Some(LedType::Sk6812W),
            _ => None,
        }
    }
}

/// Pixel string record, mirrored into the PIXEL region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct PixelParams {
    pub set_mask: u32,
    pub led_count: u16,
    pub led_type: u8,
    _padding: u8,
    /// Clock for clocked strings; 0 picks the driver default.
    pub spi_speed_hz: u32,
}

impl PixelParams {
    pub const FIELD_LED_COUNT: FieldDescriptor = FieldDescriptor {
        name: "led_count",
        offset: offset_of!(PixelParams, led_count),
        len: 2,
        mask: MASK_LED_COUNT,
    };
    pub const FIELD_LED_TYPE: FieldDescriptor = FieldDescriptor {
        name: "led_type",
        offset: offset_of!(PixelParams, led_type),
        len: 1,
        mask: MASK_LED_TYPE,
    };
    pub const FIELD_SPI_SPEED: FieldDescriptor = FieldDescriptor {
        name: "spi_speed_hz",
        offset: offset_of!(PixelParams, spi_speed_hz),
        len: 4,
        mask: MASK_SPI_SPEED,
    };

    pub const FIELDS: [FieldDescriptor; 3] = [
        Self::FIELD_LED_COUNT,
        Self::FIELD_LED_TYPE,
        Self::FIELD_SPI_SPEED,
    ];

    pub fn led(&self) -> LedType {
        LedType::from_u8(self.led_type).unwrap_or(LedType::Ws2812)
    }

    /// Applies one `key=value` config line; unknown keys are left alone.
    pub fn parse_line(&mut self, line: &str) {
        if let Ok(count) = properties::scan_u16(line, "led_count") {
            self.led_count = count;
            self.set_mask |= MASK_LED_COUNT;
        } else if let Ok(name) = properties::scan(line, "led_type") {
            if let Some(led) = LedType::from_name(name) {
                self.led_type = led as u8;
                self.set_mask |= MASK_LED_TYPE;
            }
        } else if let Ok(speed) = properties::scan_u32(line, "spi_speed_hz") {
            self.spi_speed_hz = speed;
            self.set_mask |= MASK_SPI_SPEED;
        }
    }

    pub fn parse(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }
}

impl Default for PixelParams {
    fn default() -> Self {
        Self {
            set_mask: 0,
            led_count: 170,
            led_type: LedType::Ws2812 as u8,
            _padding: 0,
            spi_speed_hz: 0,
        }
    }
}

/// Flash store façade for the PIXEL region.
pub trait PixelStore {
    fn pixel_params(&self) -> Result<PixelParams, StoreError>;
    fn save_pixel_params(&mut self, params: &PixelParams) -> Result<(), StoreError>;
    fn set_led_count(&mut self, count: u16) -> Result<(), StoreError>;
    fn set_led_type(&mut self, led: LedType) -> Result<(), StoreError>;
    fn set_spi_speed(&mut self, hz: u32) -> Result<(), StoreError>;
}

impl<F: SpiFlash> PixelStore for SpiFlashStore<F> {
    fn pixel_params(&self) -> Result<PixelParams, StoreError> {
        self.load_record(StoreId::Pixel)
    }

    fn save_pixel_params(&mut self, params: &PixelParams) -> Result<(), StoreError> {
        self.save_record(StoreId::Pixel, params)
    }

    fn set_led_count(&mut self, count: u16) -> Result<(), StoreError> {
        self.save_field(StoreId::Pixel, &PixelParams::FIELD_LED_COUNT, &count)
    }

    fn set_led_type(&mut self, led: LedType) -> Result<(), StoreError> {
        self.save_field(StoreId::Pixel, &PixelParams::FIELD_LED_TYPE, &(led as u8))
    }

    fn set_spi_speed(&mut self, hz: u32) -> Result<(), StoreError> {
        self.save_field(StoreId::Pixel, &PixelParams::FIELD_SPI_SPEED, &hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_matches_the_region() {
        assert_eq!(core::mem::size_of::<PixelParams>(), 12);
        assert_eq!(PixelParams::FIELD_LED_COUNT.offset, 4);
        assert_eq!(PixelParams::FIELD_LED_TYPE.offset, 6);
        assert_eq!(PixelParams::FIELD_SPI_SPEED.offset, 8);
    }

    #[test]
    fn parse_covers_type_count_and_clock() {
        let mut params = PixelParams::default();
        params.parse("led_type=sk6812w\nled_count=320\nspi_speed_hz=4000000\n");
        assert_eq!(params.led(), LedType::Sk6812W);
        assert_eq!(params.led_count, 320);
        assert_eq!(params.spi_speed_hz, 4_000_000);
        assert_eq!(
            params.set_mask,
            MASK_LED_TYPE | MASK_LED_COUNT | MASK_SPI_SPEED
        );
    }

    #[test]
    fn unknown_led_type_name_is_ignored() {
        let mut params = PixelParams::default();
        params.parse_line("led_type=apa102");
        assert_eq!(params.set_mask, 0);
    }
}
