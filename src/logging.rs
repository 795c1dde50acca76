use {
    crate::timer::Clock,
    core::{cell::RefCell, fmt},
};

/// `log` backend writing one line per record to a serial-style writer,
/// timestamped from a [`Clock`].
pub struct UartLogger<W, C> {
    uart: critical_section::Mutex<RefCell<W>>,
    clock: C,
}

impl<W, C> UartLogger<W, C> {
    pub const fn new(uart: W, clock: C) -> Self {
        Self {
            uart: critical_section::Mutex::new(RefCell::new(uart)),
            clock,
        }
    }
}

/// Seconds with millisecond resolution, without going through floats.
struct Timestamp(u64);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

impl<W, C> UartLogger<W, C>
where
    C: Clock,
{
    fn timestamp(&self) -> Timestamp {
        let hz = self.clock.clock_hz() as u64;
        if hz == 0 {
            return Timestamp(0);
        }
        Timestamp(self.clock.now_cycles() / (hz / 1000).max(1))
    }
}

impl<W, C> log::Log for UartLogger<W, C>
where
    W: Send + fmt::Write,
    C: Clock + Send + Sync,
{
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let timestamp = self.timestamp();

        critical_section::with(|cs| {
            writeln!(
                self.uart.borrow(cs).borrow_mut(),
                "{} {} [{}] {}",
                record.level(),
                timestamp,
                record.module_path().unwrap_or("bin"),
                record.args()
            )
            .ok();
        })
    }

    fn flush(&self) {}
}

/// Installs `logger` as the global logger. A second call leaves the first
/// logger in place.
pub fn init_logging<W, C>(logger: &'static UartLogger<W, C>, level: log::LevelFilter)
where
    W: Send + fmt::Write,
    C: Clock + Send + Sync,
{
    log::set_max_level(level);
    log::set_logger(logger).ok();
}

#[cfg(test)]
mod tests {
    use {super::*, core::sync::atomic::{AtomicU64, Ordering}, log::Log};

    struct FixedClock(AtomicU64);

    impl Clock for FixedClock {
        fn now_cycles(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }

        fn clock_hz(&self) -> u32 {
            24_000_000
        }
    }

    #[test]
    fn formats_level_time_and_module() {
        let logger = UartLogger::new(String::new(), FixedClock(AtomicU64::new(36_012_000)));

        logger.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .module_path(Some("aes_lcd_demo::demo"))
                .args(format_args!("Took {}K cycles", 259))
                .build(),
        );

        let out = critical_section::with(|cs| logger.uart.borrow(cs).borrow().clone());
        assert_eq!(out, "INFO 1.500 [aes_lcd_demo::demo] Took 259K cycles\n");
    }

    #[test]
    fn missing_module_path() {
        let logger = UartLogger::new(String::new(), FixedClock(AtomicU64::new(0)));

        logger.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .args(format_args!("timeout"))
                .build(),
        );

        let out = critical_section::with(|cs| logger.uart.borrow(cs).borrow().clone());
        assert_eq!(out, "WARN 0.000 [bin] timeout\n");
    }
}
