// Age thresholds

use crate::verdict::Status;
use crate::CheckError;
use std::time::Duration;

/// Warning and critical ages, warning strictly below critical
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    warning: Duration,
    critical: Duration,
}

impl Thresholds {
    pub fn new(warning: Duration, critical: Duration) -> Result<Self, CheckError> {
        if warning >= critical {
            return Err(CheckError::InvalidThresholds { warning, critical });
        }
        Ok(Self { warning, critical })
    }

    pub fn warning(&self) -> Duration {
        self.warning
    }

    pub fn critical(&self) -> Duration {
        self.critical
    }

    /// Map an age onto a status. Both bounds are exclusive: an age equal to
    /// a threshold does not cross it.
    pub fn classify(&self, age: Duration) -> Status {
        if age > self.critical {
            Status::Critical
        } else if age > self.warning {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}
