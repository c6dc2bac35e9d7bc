//! Real-Time Clock (RTC) in calendar mode.
//!
//! The RTC counts seconds through years off the 32.768 kHz crystal,
//! divided to a 1 Hz tick, and keeps running from the backup power domain
//! while the rest of the chip sleeps or resets.
//!
//! Every write to the RTC has to cross into the peripheral's own clock
//! domain. The driver waits on the SYNCBUSY status flag after each write,
//! so a setter returning means the value is visible to subsequent reads.
//! These waits spin without a timeout: the hardware offers no cancellation
//! path, and a stuck flag (for example a misrouted clock source) blocks
//! the caller indefinitely.

use core::marker::PhantomData;

use embassy_hal_internal::{into_ref, PeripheralRef};
use embassy_sync::waitqueue::AtomicWaker;

use crate::interrupt::typelevel::Interrupt;
use crate::{clocks, interrupt, peripherals, Peripheral};

static ALARM_WAKER: AtomicWaker = AtomicWaker::new();

/// RTC driver configuration.
#[non_exhaustive]
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Use 24-hour instead of 12-hour time representation.
    ///
    /// Decided once at construction; the hour setter reads it to fold
    /// afternoon hours onto the 12-hour clock face.
    pub hours_24: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { hours_24: true }
    }
}

/// RTC alarm interrupt handler.
///
/// Clears the pending alarm flag before returning, so the interrupt does
/// not re-enter on the same event, then wakes the registered waker.
/// Scheduling alarms is left to an external user of the match registers.
pub struct InterruptHandler<T: Instance> {
    _phantom: PhantomData<T>,
}

impl<T: Instance> interrupt::typelevel::Handler<T::Interrupt> for InterruptHandler<T> {
    unsafe fn on_interrupt() {
        let r = T::regs();
        if r.mode2().intflag.read().alarm0().bit_is_set() {
            // Write-one-to-clear; must happen before the handler returns.
            r.mode2().intflag.write(|w| w.alarm0().set_bit());
            ALARM_WAKER.wake();
        }
    }
}

/// Calendar-mode RTC driver.
///
/// Owns the peripheral for its lifetime; the hardware counter is the only
/// copy of the clock fields. Field values are passed through to hardware
/// unvalidated, so an out-of-range month or day lands in the register
/// as-is. The driver holds no internal lock: sharing it across execution
/// contexts needs caller-provided mutual exclusion, or a compound setter
/// interleaved with another write can commit a torn time.
pub struct Rtc<'d, T: Instance> {
    _inner: PeripheralRef<'d, T>,
    hours_24: bool,
}

impl<'d, T: Instance> Rtc<'d, T> {
    /// Initialize the RTC and start the calendar clock.
    ///
    /// Runs the full bring-up sequence: bus clock gate, clock-tree routing
    /// (XOSC32K divided to 1024 Hz into the RTC input), disable, software
    /// reset, calendar-mode control word with a divide-by-1024 prescaler,
    /// NVIC wiring at the highest priority with the peripheral's own alarm
    /// interrupt left disabled, then re-enable. On return the clock free
    /// runs from zero in the requested hour representation.
    ///
    /// Re-construction repeats the sequence, including the reset that
    /// zeroes any accumulated calendar state.
    pub fn new(
        inner: impl Peripheral<P = T> + 'd,
        _irq: impl interrupt::typelevel::Binding<T::Interrupt, InterruptHandler<T>> + 'd,
        config: Config,
    ) -> Self {
        into_ref!(inner);

        T::init();
        clocks::enable_rtc_clock();

        let rtc = Self {
            _inner: inner,
            hours_24: config.hours_24,
        };

        // The peripheral must be held disabled before a software reset is
        // issued; the reset then zeroes configuration and counters.
        rtc.disable();
        rtc.software_reset();

        let r = T::regs();

        // Reads are on-demand rather than served from a continuously
        // refreshed read buffer.
        r.mode2().readreq.modify(|_, w| w.rcont().clear_bit());

        r.mode2().ctrl.write(|w| {
            w.mode().clock();
            w.prescaler().div1024();
            w.matchclr().clear_bit();
            w.clkrep().bit(config.hours_24)
        });
        rtc.sync();

        T::Interrupt::set_priority(interrupt::Priority::P0);
        T::Interrupt::unpend();
        // SAFETY: the typelevel binding taken by `new` proves the handler
        // for this interrupt line is in the vector table.
        unsafe { T::Interrupt::enable() };

        // Alarms stay off until an external collaborator enables them.
        r.mode2().intenclr.write(|w| w.alarm0().set_bit());
        rtc.sync();

        rtc.enable();
        rtc.reset_remove();

        debug!("rtc: running in calendar mode, 24h={}", config.hours_24);

        rtc
    }

    /// Current seconds field (0-59, unvalidated hardware value).
    pub fn seconds(&self) -> u8 {
        T::regs().mode2().clock.read().second().bits()
    }

    /// Current minutes field (0-59, unvalidated hardware value).
    pub fn minutes(&self) -> u8 {
        T::regs().mode2().clock.read().minute().bits()
    }

    /// Current hours field (0-23 or 1-12 depending on representation).
    pub fn hours(&self) -> u8 {
        T::regs().mode2().clock.read().hour().bits()
    }

    /// Current day-of-month field (1-31, unvalidated hardware value).
    pub fn day(&self) -> u8 {
        T::regs().mode2().clock.read().day().bits()
    }

    /// Current month field (1-12, unvalidated hardware value).
    pub fn month(&self) -> u8 {
        T::regs().mode2().clock.read().month().bits()
    }

    /// Current year field (0-99, offset from the reference year).
    pub fn year(&self) -> u8 {
        T::regs().mode2().clock.read().year().bits()
    }

    /// Set the seconds field. Blocks until the write has synchronized.
    pub fn set_seconds(&mut self, seconds: u8) {
        T::regs()
            .mode2()
            .clock
            .modify(|_, w| unsafe { w.second().bits(seconds) });
        self.sync();
    }

    /// Set the minutes field. Blocks until the write has synchronized.
    pub fn set_minutes(&mut self, minutes: u8) {
        T::regs()
            .mode2()
            .clock
            .modify(|_, w| unsafe { w.minute().bits(minutes) });
        self.sync();
    }

    /// Set the hours field. Blocks until the write has synchronized.
    ///
    /// In 12-hour representation, values of 13 and above are reinterpreted
    /// as afternoon hours and written as `hours - 12`. No further
    /// validation happens, so 25 still becomes 13, off the clock face;
    /// semantic validity stays with the caller.
    pub fn set_hours(&mut self, hours: u8) {
        let hours = clock_face_hours(self.hours_24, hours);
        T::regs()
            .mode2()
            .clock
            .modify(|_, w| unsafe { w.hour().bits(hours) });
        self.sync();
    }

    /// Set the day-of-month field. Blocks until the write has synchronized.
    pub fn set_day(&mut self, day: u8) {
        T::regs().mode2().clock.modify(|_, w| unsafe { w.day().bits(day) });
        self.sync();
    }

    /// Set the month field. Blocks until the write has synchronized.
    pub fn set_month(&mut self, month: u8) {
        T::regs()
            .mode2()
            .clock
            .modify(|_, w| unsafe { w.month().bits(month) });
        self.sync();
    }

    /// Set the year field. Blocks until the write has synchronized.
    pub fn set_year(&mut self, year: u8) {
        T::regs().mode2().clock.modify(|_, w| unsafe { w.year().bits(year) });
        self.sync();
    }

    /// Set seconds, minutes and hours, in that order.
    ///
    /// Three separate synchronized writes, not one atomic commit: a
    /// concurrent writer can observe (or produce) a mix of old and new
    /// fields in between.
    pub fn set_time(&mut self, hours: u8, minutes: u8, seconds: u8) {
        self.set_seconds(seconds);
        self.set_minutes(minutes);
        self.set_hours(hours);
    }

    /// Set day, month and year, in that order.
    ///
    /// Same non-atomic commit behavior as [`set_time`](Self::set_time).
    pub fn set_date(&mut self, day: u8, month: u8, year: u8) {
        self.set_day(day);
        self.set_month(month);
        self.set_year(year);
    }

    /// Register a waker to be notified when the alarm interrupt fires.
    ///
    /// The handler clears the pending flag itself; alarm match
    /// configuration belongs to an external collaborator. Only one waker
    /// is held at a time; registering replaces the previous one.
    pub fn register_alarm_waker(&self, waker: &core::task::Waker) {
        ALARM_WAKER.register(waker);
    }

    /// Spin until the last register write has crossed into the RTC clock
    /// domain. No timeout; see the module docs for the failure mode.
    fn sync(&self) {
        while T::regs().mode2().status.read().syncbusy().bit_is_set() {}
    }

    fn enable(&self) {
        T::regs().mode2().ctrl.modify(|_, w| w.enable().set_bit());
        self.sync();
    }

    fn disable(&self) {
        T::regs().mode2().ctrl.modify(|_, w| w.enable().clear_bit());
        self.sync();
    }

    fn software_reset(&self) {
        T::regs().mode2().ctrl.modify(|_, w| w.swrst().set_bit());
        self.sync();
    }

    fn reset_remove(&self) {
        T::regs().mode2().ctrl.modify(|_, w| w.swrst().clear_bit());
        self.sync();
    }
}

impl<'d, T: Instance> Drop for Rtc<'d, T> {
    fn drop(&mut self) {
        // The counter keeps free-running from the backup domain; only the
        // interrupt line is taken down with the driver.
        T::drop();
    }
}

/// Hour value as written to hardware for the given representation.
fn clock_face_hours(hours_24: bool, hours: u8) -> u8 {
    if hours_24 || hours < 13 {
        hours
    } else {
        hours - 12
    }
}

trait SealedInstance {
    /// Returns a reference to the peripheral's register block.
    fn regs() -> &'static crate::pac::rtc::RegisterBlock;

    /// Enables the bus interface clock to the peripheral.
    fn init();

    /// Tears down the interrupt line when the driver goes out of scope.
    fn drop();
}

/// RTC instance trait.
#[allow(private_bounds)]
pub trait Instance: SealedInstance + Peripheral<P = Self> + 'static + Send {
    /// Interrupt for this RTC instance.
    type Interrupt: interrupt::typelevel::Interrupt;
}

impl Instance for peripherals::RTC {
    type Interrupt = crate::interrupt::typelevel::RTC;
}

impl SealedInstance for peripherals::RTC {
    fn regs() -> &'static crate::pac::rtc::RegisterBlock {
        // SAFETY: the Peripheral singleton consumed by `Rtc::new` keeps
        // this register block singly owned.
        unsafe { &*crate::pac::RTC::ptr() }
    }

    fn init() {
        // SAFETY: read-modify-write of the shared APBA mask; no other
        // driver in this crate touches it.
        let pm = unsafe { &*crate::pac::PM::ptr() };
        pm.apbamask.modify(|_, w| w.rtc_().set_bit());
    }

    fn drop() {
        cortex_m::peripheral::NVIC::mask(crate::pac::Interrupt::RTC);
    }
}

#[cfg(test)]
mod tests {
    use super::clock_face_hours;

    #[test]
    fn hours_pass_through_in_24h_mode() {
        for h in 0..=23 {
            assert_eq!(clock_face_hours(true, h), h);
        }
    }

    #[test]
    fn morning_hours_unchanged_in_12h_mode() {
        for h in 0..=12 {
            assert_eq!(clock_face_hours(false, h), h);
        }
    }

    #[test]
    fn afternoon_hours_fold_onto_clock_face_in_12h_mode() {
        assert_eq!(clock_face_hours(false, 13), 1);
        assert_eq!(clock_face_hours(false, 15), 3);
        assert_eq!(clock_face_hours(false, 23), 11);
    }

    #[test]
    fn out_of_range_hours_are_not_clamped() {
        // 25 in 12-hour mode folds to 13, which is itself off the 1-12
        // clock face; the value is passed through regardless.
        assert_eq!(clock_face_hours(false, 25), 13);
        assert_eq!(clock_face_hours(true, 25), 25);
    }
}
