//! Cycle counting, polled delays and run timing.

use core::fmt;

/// A free-running cycle counter.
pub trait Clock {
    fn now_cycles(&self) -> u64;

    /// Frequency the counter runs at.
    fn clock_hz(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_cycles(&self) -> u64 {
        (**self).now_cycles()
    }

    fn clock_hz(&self) -> u32 {
        (**self).clock_hz()
    }
}

/// Number of counter cycles in `micros` microseconds.
pub fn micros_to_cycles(clock_hz: u32, micros: u32) -> u64 {
    (micros as u64 * clock_hz as u64) / 1_000_000
}

/// A point in time after which a polled wait is declared failed.
#[derive(Debug, Copy, Clone)]
pub struct Deadline {
    start: u64,
    budget: u64,
}

impl Deadline {
    pub fn new<C: Clock>(clock: &C, micros: u32) -> Self {
        Self {
            start: clock.now_cycles(),
            budget: micros_to_cycles(clock.clock_hz(), micros),
        }
    }

    pub fn expired<C: Clock>(&self, clock: &C) -> bool {
        clock.now_cycles().wrapping_sub(self.start) > self.budget
    }
}

pub fn busy_wait_ms<C: Clock>(clock: &C, ms: u32) {
    let base = clock.now_cycles();
    let delay = (clock.clock_hz() as u64 / 1000) * ms as u64;

    loop {
        let current = clock.now_cycles().wrapping_sub(base);

        if current >= delay {
            break;
        }
    }
}

/// Cycle count captured at the start of a measured section.
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct Profile(u64);

impl Profile {
    pub fn start<C: Clock>(clock: &C) -> Self {
        Profile(clock.now_cycles())
    }

    /// Returns the cycles elapsed since [`Profile::start`].
    pub fn stop<C: Clock>(self, clock: &C) -> u64 {
        clock.now_cycles().saturating_sub(self.0)
    }
}

/// Converts a cycle count to milliseconds, truncating.
///
/// Goes through microseconds first and both divisions truncate, so
/// `to_millis(8_099_999, 100)` is `80`.
pub fn to_millis(cycles: u64, clock_mhz: u32) -> u64 {
    if clock_mhz == 0 {
        return 0;
    }
    let micros = cycles / clock_mhz as u64;
    micros / 1000
}

/// Throughput summary of one pipeline run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Report {
    pub cycles: u64,
    pub clock_hz: u32,
}

impl Report {
    pub fn new(cycles: u64, clock_hz: u32) -> Self {
        Self { cycles, clock_hz }
    }

    pub fn clock_mhz(&self) -> u32 {
        self.clock_hz / 1_000_000
    }

    pub fn kilo_cycles(&self) -> u64 {
        self.cycles / 1000
    }

    pub fn millis(&self) -> u64 {
        to_millis(self.cycles, self.clock_mhz())
    }

    /// `"Took 123K cycles"`
    pub fn cycles_line(&self) -> impl fmt::Display + '_ {
        CyclesLine(self)
    }

    /// `"5ms @ 24 MHz"`
    pub fn time_line(&self) -> impl fmt::Display + '_ {
        TimeLine(self)
    }
}

struct CyclesLine<'a>(&'a Report);

impl fmt::Display for CyclesLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Took {}K cycles", self.0.kilo_cycles())
    }
}

struct TimeLine<'a>(&'a Report);

impl fmt::Display for TimeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms @ {} MHz", self.0.millis(), self.0.clock_mhz())
    }
}

/// The `mcycle` performance counter of the RISC-V core.
#[cfg(feature = "riscv")]
pub struct McycleClock {
    clock_hz: u32,
}

#[cfg(feature = "riscv")]
impl McycleClock {
    pub const fn new(clock_hz: u32) -> Self {
        Self { clock_hz }
    }
}

#[cfg(feature = "riscv")]
impl Clock for McycleClock {
    fn now_cycles(&self) -> u64 {
        riscv::register::mcycle::read64()
    }

    fn clock_hz(&self) -> u32 {
        self.clock_hz
    }
}

#[cfg(test)]
mod tests {
    use {super::*, core::cell::Cell};

    struct StepClock {
        now: Cell<u64>,
        step: u64,
        hz: u32,
    }

    impl Clock for StepClock {
        fn now_cycles(&self) -> u64 {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }

        fn clock_hz(&self) -> u32 {
            self.hz
        }
    }

    #[test]
    fn to_millis_truncates() {
        assert_eq!(to_millis(8_000_000, 100), 80);
        assert_eq!(to_millis(8_000_001, 100), 80);
        assert_eq!(to_millis(8_099_999, 100), 80);
        assert_eq!(to_millis(99_999, 100), 0);
        assert_eq!(to_millis(1234, 0), 0);
    }

    #[test]
    fn report_lines() {
        let report = Report::new(1_234_567, 24_000_000);
        assert_eq!(report.clock_mhz(), 24);
        assert_eq!(report.kilo_cycles(), 1234);
        assert_eq!(report.millis(), 51);
        assert_eq!(format!("{}", report.cycles_line()), "Took 1234K cycles");
        assert_eq!(format!("{}", report.time_line()), "51ms @ 24 MHz");
    }

    #[test]
    fn deadline_expires_after_budget() {
        let clock = StepClock {
            now: Cell::new(0),
            step: 10,
            hz: 1_000_000,
        };
        // 100us at 1MHz is 100 cycles.
        let deadline = Deadline::new(&clock, 100);
        let mut polls = 0;
        while !deadline.expired(&clock) {
            polls += 1;
        }
        assert_eq!(polls, 10);
    }

    #[test]
    fn busy_wait_consumes_delay() {
        let clock = StepClock {
            now: Cell::new(5),
            step: 7,
            hz: 1_000_000,
        };
        busy_wait_ms(&clock, 2);
        assert!(clock.now.get() >= 5 + 2000);
    }

    #[test]
    fn profile_measures_elapsed() {
        let clock = StepClock {
            now: Cell::new(100),
            step: 50,
            hz: 1_000_000,
        };
        let token = Profile::start(&clock);
        assert_eq!(token.stop(&clock), 50);
    }
}
