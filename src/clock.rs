// src/clock.rs

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

/// Time source injected into every "today"-relative computation so the CLI and
/// tests can pin the reference instant instead of reading the wall clock.
#[derive(Debug, Clone)]
pub enum Clock {
    System,
    Fixed(Arc<Mutex<NaiveDateTime>>),
}

impl Clock {
    pub fn system() -> Self {
        Clock::System
    }

    pub fn fixed(at: NaiveDateTime) -> Self {
        Clock::Fixed(Arc::new(Mutex::new(at)))
    }

    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(at) => *at.lock().unwrap(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Repins a fixed clock. No effect on the system clock.
    pub fn set(&self, at: NaiveDateTime) {
        if let Clock::Fixed(slot) = self {
            *slot.lock().unwrap() = at;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
