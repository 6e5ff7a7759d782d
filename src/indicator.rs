//! Indicator outputs.
//!
//! LEDs on the development kit are active low: driving the pin high turns
//! the LED off.

use embedded_hal::digital::OutputPin;

use crate::ble::{HvxKind, NotificationSink};

/// Side-effect state tied to a connection-table slot.
pub trait SlotIndicator {
    /// Called when the slot at `index` is destroyed.
    fn release(&mut self, index: usize);
}

impl SlotIndicator for () {
    fn release(&mut self, _index: usize) {}
}

/// One LED per slot.  Slots beyond the bank have no indicator.
pub struct IndicatorBank<P, const N: usize> {
    pins: [P; N],
}

impl<P: OutputPin, const N: usize> IndicatorBank<P, N> {
    pub fn new(pins: [P; N]) -> Self {
        Self { pins }
    }

    /// Light or clear the LED of slot `index`.
    pub fn set(&mut self, index: usize, on: bool) -> Result<(), P::Error> {
        match self.pins.get_mut(index) {
            Some(pin) => drive(pin, on),
            None => Ok(()),
        }
    }

    pub fn pins(&self) -> &[P; N] {
        &self.pins
    }
}

impl<P: OutputPin, const N: usize> SlotIndicator for IndicatorBank<P, N> {
    fn release(&mut self, index: usize) {
        if self.set(index, false).is_err() {
            warn!("slot {}: failed to clear indicator", index);
        }
    }
}

/// Mirrors received values on two LEDs, one per event kind.
pub struct LedSink<P> {
    notification: P,
    indication: P,
}

impl<P: OutputPin> LedSink<P> {
    pub fn new(notification: P, indication: P) -> Self {
        Self {
            notification,
            indication,
        }
    }

    /// `(notification, indication)` pins.
    pub fn pins(&self) -> (&P, &P) {
        (&self.notification, &self.indication)
    }

    pub fn into_pins(self) -> (P, P) {
        (self.notification, self.indication)
    }
}

impl<P: OutputPin> NotificationSink for LedSink<P> {
    fn on_notification(&mut self, value: u8, kind: HvxKind) {
        let pin = match kind {
            HvxKind::Notification => &mut self.notification,
            HvxKind::Indication => &mut self.indication,
        };
        if drive(pin, value != 0).is_err() {
            warn!("failed to drive {:?} LED", kind);
        }
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_low()
    } else {
        pin.set_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct Pin {
        high: Option<bool>,
    }

    impl ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = Some(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = Some(true);
            Ok(())
        }
    }

    #[test]
    fn release_turns_slot_led_off() {
        let mut bank = IndicatorBank::new([Pin::default(), Pin::default()]);
        bank.set(1, true).unwrap();
        assert_eq!(bank.pins()[1].high, Some(false));

        bank.release(1);
        assert_eq!(bank.pins()[1].high, Some(true));
        assert_eq!(bank.pins()[0].high, None);
    }

    #[test]
    fn release_beyond_bank_is_ignored() {
        let mut bank = IndicatorBank::new([Pin::default()]);
        bank.release(5);
        assert_eq!(bank.pins()[0].high, None);
    }

    #[test]
    fn led_sink_picks_pin_by_kind() {
        let mut sink = LedSink::new(Pin::default(), Pin::default());
        sink.on_notification(1, HvxKind::Notification);
        sink.on_notification(0, HvxKind::Indication);

        let (notification, indication) = sink.into_pins();
        assert_eq!(notification.high, Some(false));
        assert_eq!(indication.high, Some(true));
    }
}
