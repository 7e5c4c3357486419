//! Pause source between two polls.
//!
//! Waits never call `thread::sleep` directly; they go through a [`Pacer`] so a
//! simulated clock can advance virtual time instead of blocking.

use std::thread;
use std::time::Duration;

/// Blocks (or pretends to) for one poll interval.
pub trait Pacer {
    fn pause(&mut self, interval: Duration);
}

/// Wall-clock pacer backed by [`thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    #[inline]
    fn pause(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    #[inline]
    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval);
    }
}

impl<P: Pacer + ?Sized> Pacer for Box<P> {
    #[inline]
    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval);
    }
}
