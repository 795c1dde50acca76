//! [`LcdInterface`] over embedded-hal 1.0 traits.

use {
    crate::{error::Error, lcd::LcdInterface},
    embedded_hal::{
        delay::DelayNs,
        digital::{OutputPin, PinState},
        spi::SpiBus,
    },
};

/// SPI bus plus the chip select and data/command GPIOs.
///
/// Chip select is driven by software so a pixel stream can span many bus
/// writes without the panel being released in between.
pub struct HalInterface<SPI, CS, DC, D> {
    spi: SPI,
    cs: CS,
    dc: DC,
    delay: D,
}

impl<SPI, CS, DC, D> HalInterface<SPI, CS, DC, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, dc: DC, delay: D) -> Self {
        Self { spi, cs, dc, delay }
    }

    pub fn release(self) -> (SPI, CS, DC, D) {
        (self.spi, self.cs, self.dc, self.delay)
    }
}

impl<SPI, CS, DC, D> LcdInterface for HalInterface<SPI, CS, DC, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    D: DelayNs,
{
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        self.spi.write(data).map_err(|_| Error::Interface)?;
        // Wait for the transmit FIFO to drain before the control lines move.
        self.spi.flush().map_err(|_| Error::Interface)
    }

    fn set_control_lines(&mut self, cs: bool, dc: bool) -> Result<(), Error> {
        self.cs
            .set_state(PinState::from(cs))
            .map_err(|_| Error::Interface)?;
        self.dc
            .set_state(PinState::from(dc))
            .map_err(|_| Error::Interface)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        core::convert::Infallible,
        embedded_hal::{digital::ErrorType as PinErrorType, spi::ErrorType as SpiErrorType},
        std::{cell::RefCell, rc::Rc},
    };

    type Log = Rc<RefCell<Vec<String>>>;

    struct Bus(Log);
    struct Pin(&'static str, Log);
    struct Delay(Log);

    impl SpiErrorType for Bus {
        type Error = Infallible;
    }

    impl SpiBus for Bus {
        fn read(&mut self, _: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
            self.0.borrow_mut().push(format!("spi {:02x?}", words));
            Ok(())
        }

        fn transfer(&mut self, _: &mut [u8], _: &[u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn transfer_in_place(&mut self, _: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push("flush".into());
            Ok(())
        }
    }

    impl PinErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.1.borrow_mut().push(format!("{} low", self.0));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.1.borrow_mut().push(format!("{} high", self.0));
            Ok(())
        }
    }

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(format!("delay {}ns", ns));
        }
    }

    #[test]
    fn drives_bus_and_pins() {
        let log = Log::default();
        let mut iface = HalInterface::new(
            Bus(log.clone()),
            Pin("cs", log.clone()),
            Pin("dc", log.clone()),
            Delay(log.clone()),
        );

        iface.set_control_lines(false, true).unwrap();
        iface.write_bytes(&[0x2c, 0x01]).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["cs low", "dc high", "spi [2c, 01]", "flush"]
        );
    }

    #[test]
    fn delays_in_milliseconds() {
        let log = Log::default();
        let mut iface = HalInterface::new(
            Bus(log.clone()),
            Pin("cs", log.clone()),
            Pin("dc", log.clone()),
            Delay(log.clone()),
        );

        iface.delay_ms(2);

        assert!(!log.borrow().is_empty());
        assert!(log.borrow().iter().all(|e| e.starts_with("delay")));
    }
}
