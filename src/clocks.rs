//! Clock tree configuration for the SAMD21.
//!
//! The only consumer in this crate is the RTC, which is fed from the
//! external 32.768 kHz crystal oscillator (XOSC32K) through generic clock
//! generator 2. The oscillator itself is started once at HAL init; the
//! generator and the RTC clock channel are routed when the RTC driver is
//! constructed.

use crate::pac;

/// Generic clock generator feeding the RTC.
const RTC_GCLK_GEN: u8 = 2;

/// GENDIV.DIV value for the RTC generator. With DIVSEL set the generator
/// divides by 2^(DIV + 1), so 4 gives a divide-by-32.
const RTC_GCLK_DIV: u16 = 4;

/// Crystal frequency at the XIN32/XOUT32 pins.
const XOSC32K_HZ: u32 = 32_768;

/// Clock configuration.
#[non_exhaustive]
pub struct ClockConfig {
    /// External 32.768 kHz crystal oscillator settings.
    pub xosc32k: Xosc32kConfig,
}

/// XOSC32K oscillator settings.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Xosc32kConfig {
    /// Start-up delay, as a raw STARTUP field value (0..=7).
    pub startup: u8,
    /// Keep the oscillator running in standby sleep mode.
    pub run_standby: bool,
    /// Run the oscillator only while a clock consumer requests it.
    pub on_demand: bool,
}

impl ClockConfig {
    /// Clock configuration derived from the external 32.768 kHz crystal.
    pub fn crystal() -> Self {
        Self {
            xosc32k: Xosc32kConfig {
                startup: 6,
                run_standby: true,
                on_demand: true,
            },
        }
    }
}

/// Frequency delivered to the RTC clock input by generator 2, in Hz.
pub(crate) const fn rtc_generic_clock_hz() -> u32 {
    XOSC32K_HZ >> (RTC_GCLK_DIV as u32 + 1)
}

/// Start the external 32.768 kHz crystal oscillator.
///
/// The whole XOSC32K register is written in one store; the oscillator is
/// left to start on demand, so there is no ready-wait here.
///
/// safety: must be called exactly once at bootup
pub(crate) unsafe fn init(config: ClockConfig) {
    let sysctrl = &*pac::SYSCTRL::ptr();

    sysctrl.xosc32k.write(|w| {
        w.ondemand().bit(config.xosc32k.on_demand);
        w.runstdby().bit(config.xosc32k.run_standby);
        w.en32k().set_bit();
        w.xtalen().set_bit();
        unsafe { w.startup().bits(config.xosc32k.startup) };
        w.enable().set_bit()
    });
}

/// Route XOSC32K, divided down to 1024 Hz, into the RTC clock input.
///
/// Each generator/divider register write is followed by a wait on the
/// GCLK SYNCBUSY flag before the next one is issued. These waits do not
/// time out; a missing crystal stalls here for good.
pub(crate) fn enable_rtc_clock() {
    // SAFETY: register-level access only, ordered by the SYNCBUSY waits.
    let gclk = unsafe { &*pac::GCLK::ptr() };

    gclk.gendiv.write(|w| unsafe {
        w.id().bits(RTC_GCLK_GEN);
        w.div().bits(RTC_GCLK_DIV)
    });
    while gclk.status.read().syncbusy().bit_is_set() {}

    gclk.genctrl.write(|w| {
        unsafe { w.id().bits(RTC_GCLK_GEN) };
        w.src().xosc32k();
        w.divsel().set_bit();
        w.genen().set_bit()
    });
    while gclk.status.read().syncbusy().bit_is_set() {}

    gclk.clkctrl.write(|w| {
        w.id().rtc();
        w.gen().gclk2();
        w.clken().set_bit()
    });
    while gclk.status.read().syncbusy().bit_is_set() {}

    trace!("rtc generic clock running at {} Hz", rtc_generic_clock_hz());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_divides_crystal_to_1024_hz() {
        assert_eq!(rtc_generic_clock_hz(), 1_024);
    }

    #[test]
    fn prescaler_brings_counter_to_one_hz() {
        // The RTC is configured with a divide-by-1024 prescaler on top of
        // the generator output, for a 1 Hz calendar tick.
        assert_eq!(rtc_generic_clock_hz() / 1_024, 1);
    }
}
