use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{RequestOutcome, ServiceError};

/// Rejects a second submission of the same operation while one is pending.
pub struct InFlight {
    operation: &'static str,
    busy: AtomicBool,
}

impl InFlight {
    pub const fn new(operation: &'static str) -> Self {
        Self {
            operation,
            busy: AtomicBool::new(false),
        }
    }

    pub fn try_begin(&self) -> RequestOutcome<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ServiceError::validation(format!("{} already in progress", self.operation)))?;
        Ok(InFlightGuard { flag: &self.busy })
    }
}

pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
