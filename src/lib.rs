#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Feature flags
#![doc = document_features::document_features!(feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod clocks;
pub mod rtc;

// Reexports
pub use atsamd21g as pac;
pub use embassy_hal_internal::{into_ref, Peripheral, PeripheralRef};
pub use rtc::Rtc;

#[cfg(feature = "rt")]
pub use crate::pac::NVIC_PRIO_BITS;

pub use interrupts::*;

/// Wrapper module to suppress clippy warning caused by macro.
#[allow(clippy::missing_safety_doc)]
pub mod interrupts {
    embassy_hal_internal::interrupt_mod!(
        PM, SYSCTRL, WDT, RTC, EIC, NVMCTRL, DMAC, USB, EVSYS, SERCOM0, SERCOM1, SERCOM2, SERCOM3, SERCOM4, SERCOM5,
        TCC0, TCC1, TCC2, TC3, TC4, TC5, ADC, AC, DAC, I2S,
    );
}

/// Macro to bind interrupts to handlers.
///
/// This defines the right interrupt handlers, and creates a unit struct (like `struct Irqs;`)
/// and implements the right \[`Binding`\]s for it. You can pass this struct to drivers to
/// prove at compile-time that the right interrupts have been bound.
///
/// Example of how to bind one interrupt:
///
/// ```rust,ignore
/// use samd21_rtc::{bind_interrupts, peripherals, rtc};
///
/// bind_interrupts!(struct Irqs {
///     RTC => rtc::InterruptHandler<peripherals::RTC>;
/// });
/// ```
///
// developer note: this macro can't be in `embassy-hal-internal` due to the use of `$crate`.
#[macro_export]
macro_rules! bind_interrupts {
    ($vis:vis struct $name:ident { $($irq:ident => $($handler:ty),*;)* }) => {
            #[derive(Copy, Clone)]
            $vis struct $name;

        $(
            #[allow(non_snake_case)]
            #[no_mangle]
            unsafe extern "C" fn $irq() {
                $(
                    <$handler as $crate::interrupt::typelevel::Handler<$crate::interrupt::typelevel::$irq>>::on_interrupt();
                )*
            }

            $(
                unsafe impl $crate::interrupt::typelevel::Binding<$crate::interrupt::typelevel::$irq, $handler> for $name {}
            )*
        )*
    };
}

embassy_hal_internal::peripherals!(
    AC, ADC, DAC, DMAC, EIC, EVSYS, GCLK, I2S, NVMCTRL, PM, PORT, PTC, RTC, SERCOM0, SERCOM1, SERCOM2, SERCOM3,
    SERCOM4, SERCOM5, SYSCTRL, TC3, TC4, TC5, TCC0, TCC1, TCC2, USB, WDT,
);

/// HAL configuration for the SAMD21.
pub mod config {
    use crate::clocks::ClockConfig;

    /// HAL configuration passed when initializing.
    #[non_exhaustive]
    pub struct Config {
        /// Clock configuration.
        pub clocks: ClockConfig,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                clocks: ClockConfig::crystal(),
            }
        }
    }

    impl Config {
        /// Create a new configuration with the provided clock config.
        pub fn new(clocks: ClockConfig) -> Self {
            Self { clocks }
        }
    }
}

/// Initialize the `samd21-rtc` HAL with the provided configuration.
///
/// This returns the peripheral singletons that can be used for creating drivers.
///
/// This should only be called once at startup, otherwise it panics.
pub fn init(config: config::Config) -> Peripherals {
    // Do this first, so that it panics if user is calling `init` a second time
    // before doing anything important.
    let peripherals = Peripherals::take();

    unsafe {
        clocks::init(config.clocks);
    }

    peripherals
}
