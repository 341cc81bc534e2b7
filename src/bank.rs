use std::time::Instant;

use crate::error::{Fault, Result};
use crate::notify::Notifier;

/// Fixed-size boolean word memory. Cells persist across scan cycles until
/// reset.
pub struct Memory {
    cells: Vec<bool>,
    notifier: Notifier,
}

impl Memory {
    pub fn new(len: usize) -> Self {
        Memory {
            cells: vec![false; len],
            notifier: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, addr: usize) -> Result<bool> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(Fault::OutOfRange { bank: "memory", addr, len: self.cells.len() })
    }

    pub fn set(&mut self, addr: usize, value: bool) -> Result<()> {
        let len = self.cells.len();
        match self.cells.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                self.notifier.notify();
                Ok(())
            }
            None => Err(Fault::OutOfRange { bank: "memory", addr, len }),
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(false);
        self.notifier.notify();
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.notifier.subscribe(observer);
    }
}

/// Integer counter bank mutated by SET/INC/DEC and compared by CMP/GT/LE.
pub struct Counters {
    cells: Vec<i32>,
    notifier: Notifier,
}

impl Counters {
    pub fn new(len: usize) -> Self {
        Counters {
            cells: vec![0; len],
            notifier: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, addr: usize) -> Result<i32> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(Fault::OutOfRange { bank: "counter", addr, len: self.cells.len() })
    }

    pub fn set(&mut self, addr: usize, value: i32) -> Result<()> {
        let len = self.cells.len();
        match self.cells.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                self.notifier.notify();
                Ok(())
            }
            None => Err(Fault::OutOfRange { bank: "counter", addr, len }),
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.notifier.notify();
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.notifier.subscribe(observer);
    }
}

/// One armed timer: reads true while the elapsed milliseconds since
/// `started` stay within `duration_ms`. A negative duration is already
/// expired and never reads true.
#[derive(Clone, Copy)]
struct Timer {
    started: Instant,
    duration_ms: i64,
}

impl Timer {
    fn value(&self, now: Instant) -> bool {
        now.duration_since(self.started).as_millis() as i64 <= self.duration_ms
    }
}

/// Wall-clock elapsed-duration timers. Cells are polled, never push a
/// notification on expiry; an unset cell reads false.
pub struct Timers {
    cells: Vec<Option<Timer>>,
    notifier: Notifier,
}

impl Timers {
    pub fn new(len: usize) -> Self {
        Timers {
            cells: vec![None; len],
            notifier: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, addr: usize) -> Result<bool> {
        let now = Instant::now();
        self.cells
            .get(addr)
            .map(|cell| cell.is_some_and(|timer| timer.value(now)))
            .ok_or(Fault::OutOfRange { bank: "timer", addr, len: self.cells.len() })
    }

    /// (Re)start the timer at `addr` for `duration_ms` milliseconds from now.
    /// A negative duration arms a timer that is already expired.
    pub fn set_timer(&mut self, addr: usize, duration_ms: i32) -> Result<()> {
        let len = self.cells.len();
        match self.cells.get_mut(addr) {
            Some(cell) => {
                *cell = Some(Timer {
                    started: Instant::now(),
                    duration_ms: duration_ms as i64,
                });
                self.notifier.notify();
                Ok(())
            }
            None => Err(Fault::OutOfRange { bank: "timer", addr, len }),
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(None);
        self.notifier.notify();
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.notifier.subscribe(observer);
    }
}

#[cfg(test)]
mod test {
    use std::thread::sleep;
    use std::time::Duration;

    use super::*;

    #[test]
    fn memory_persists_until_reset() {
        let mut memory = Memory::new(4);
        memory.set(2, true).unwrap();
        assert_eq!(memory.get(2), Ok(true));
        memory.reset();
        assert_eq!(memory.get(2), Ok(false));
    }

    #[test]
    fn memory_bounds_fault() {
        let mut memory = Memory::new(4);
        assert_eq!(
            memory.set(4, true),
            Err(Fault::OutOfRange { bank: "memory", addr: 4, len: 4 })
        );
        assert!(memory.get(17).is_err());
    }

    #[test]
    fn counters_hold_signed_values() {
        let mut counters = Counters::new(2);
        counters.set(0, -3).unwrap();
        assert_eq!(counters.get(0), Ok(-3));
        counters.reset();
        assert_eq!(counters.get(0), Ok(0));
    }

    #[test]
    fn unset_timer_reads_false() {
        let timers = Timers::new(2);
        assert_eq!(timers.get(0), Ok(false));
    }

    #[test]
    fn timer_expires_after_duration() {
        let mut timers = Timers::new(2);
        timers.set_timer(0, 30).unwrap();
        assert_eq!(timers.get(0), Ok(true));
        sleep(Duration::from_millis(60));
        assert_eq!(timers.get(0), Ok(false));
    }

    #[test]
    fn negative_duration_reads_false_immediately() {
        let mut timers = Timers::new(1);
        timers.set_timer(0, -100).unwrap();
        assert_eq!(timers.get(0), Ok(false));
    }

    #[test]
    fn timer_rearm_restarts_window() {
        let mut timers = Timers::new(1);
        timers.set_timer(0, 30).unwrap();
        sleep(Duration::from_millis(20));
        timers.set_timer(0, 30).unwrap();
        sleep(Duration::from_millis(20));
        assert_eq!(timers.get(0), Ok(true));
    }

    #[test]
    fn reset_disarms_timers() {
        let mut timers = Timers::new(1);
        timers.set_timer(0, 10_000).unwrap();
        timers.reset();
        assert_eq!(timers.get(0), Ok(false));
    }
}
