// Licensed under the Apache-2.0 license

use fw_rom_common::BootPlatform;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// Terminal platform transition observed by a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    ColdReset,
    Halt(u32),
}

/// Platform whose terminal calls unwind with a [`Terminal`] payload.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub watchdog_fired: bool,
    pub clear_count: u32,
    pub reset_count: u32,
    pub halt_codes: Vec<u32>,
}

impl FakePlatform {
    pub fn after_watchdog_timeout() -> Self {
        FakePlatform {
            watchdog_fired: true,
            ..Default::default()
        }
    }
}

impl BootPlatform for FakePlatform {
    fn watchdog_timeout_occurred(&mut self) -> bool {
        self.watchdog_fired
    }

    fn clear_watchdog_status(&mut self) {
        self.clear_count += 1;
        self.watchdog_fired = false;
    }

    fn cold_reset(&mut self) -> ! {
        self.reset_count += 1;
        std::panic::panic_any(Terminal::ColdReset)
    }

    fn halt(&mut self, code: u32) -> ! {
        self.halt_codes.push(code);
        std::panic::panic_any(Terminal::Halt(code))
    }
}

/// Runs `f` and reports the terminal transition that ended it, if any.
/// Other panics are propagated.
pub fn run_to_terminal<R>(f: impl FnOnce() -> R) -> Result<R, Terminal> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| match payload.downcast::<Terminal>() {
        Ok(terminal) => *terminal,
        Err(payload) => resume_unwind(payload),
    })
}
