use std::time::Duration;
use tracing::{debug, trace};

use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::{HwError, Result};
use crate::util::wait_until_ready;

/// Bit-banged HX711 24-bit load-cell ADC.
///
/// Holding SCK high for more than 60 µs powers the chip down; `Drop` does that,
/// so the GPIO lines are always left in a defined state on shutdown.
pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    gain_pulses: u8, // 25, 26, 27 based on gain/channel
}

impl Hx711 {
    /// Acquire DT/SCK from the GPIO controller. `gain_pulses` selects channel
    /// A gain 128 (25), B gain 32 (26) or A gain 64 (27).
    pub fn open(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
            .into_input();
        let mut sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
            .into_output();
        sck.set_low(); // clock idle low, also wakes the chip
        debug!(dt_pin, sck_pin, gain_pulses, "hx711 opened");
        Ok(Self {
            dt,
            sck,
            gain_pulses,
        })
    }

    /// Read one signed 24-bit conversion, waiting up to `timeout` for data-ready.
    pub fn read_raw(&mut self, timeout: Duration) -> Result<i32> {
        let dt = &self.dt;
        wait_until_ready(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut value: i32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_100ns();
            value = (value << 1) | i32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay_100ns();
        }

        // Extra pulses select gain/channel for the next conversion
        for _ in 24..self.gain_pulses {
            self.sck.set_high();
            spin_delay_100ns();
            self.sck.set_low();
            spin_delay_100ns();
        }

        // Sign extend 24-bit
        if (value & 0x80_0000) != 0 {
            value |= !0xFF_FFFF;
        }
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }

    pub fn power_down(&mut self) {
        self.sck.set_low();
        self.sck.set_high();
        std::thread::sleep(Duration::from_micros(100));
    }
}

impl Drop for Hx711 {
    fn drop(&mut self) {
        self.power_down();
        debug!("hx711 powered down");
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    std::hint::spin_loop();
}
