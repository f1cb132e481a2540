use padlight_domain_protocol::{Advisory, AdvisoryKind, Family};
use std::collections::HashSet;

/// Shows each firmware advisory once per process.
#[derive(Debug, Default)]
pub struct AdvisoryLatch {
    seen: HashSet<Advisory>,
}

impl AdvisoryLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the message to show the first time an advisory is raised.
    pub fn latch(&mut self, advisory: Advisory) -> Option<String> {
        if !self.seen.insert(advisory) {
            return None;
        }
        let message = advisory_message(advisory);
        tracing::warn!(family = %advisory.family, kind = ?advisory.kind, "{message}");
        Some(message)
    }

    pub fn is_latched(&self, advisory: &Advisory) -> bool {
        self.seen.contains(advisory)
    }
}

pub fn advisory_message(advisory: Advisory) -> String {
    match (advisory.kind, advisory.family) {
        (AdvisoryKind::IncompatibleFirmware, Family::Cfw) => {
            "this custom firmware build is no longer supported; install the current custom firmware"
                .to_string()
        }
        (AdvisoryKind::IncompatibleFirmware, family) => {
            format!("{family} is running firmware that cannot be driven")
        }
        (AdvisoryKind::OldFirmware, family) => {
            format!("{family} firmware is out of date; some lights may not update correctly")
        }
        (AdvisoryKind::StockFirmware, family) => {
            format!("{family} runs stock firmware; the custom firmware enables faster updates")
        }
    }
}
