//! FFI layer between Rust and scripts
//!
//! Handle-based access to host systems. Scripts only ever see plain numbers.

use kite_core::timer::TimerId;

/// Largest integer a JS number represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Opaque handle for script access
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScriptHandle(pub u64);

impl ScriptHandle {
    /// Encode as a JS number.
    pub fn to_js(self) -> f64 {
        self.0 as f64
    }

    /// Decode a JS number. Rejects fractions, negatives, NaN and values
    /// beyond the exactly-representable range.
    pub fn from_js(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_SAFE_INTEGER {
            Some(ScriptHandle(value as u64))
        } else {
            None
        }
    }
}

impl From<TimerId> for ScriptHandle {
    fn from(id: TimerId) -> Self {
        ScriptHandle(id.raw())
    }
}

impl From<ScriptHandle> for TimerId {
    fn from(handle: ScriptHandle) -> Self {
        TimerId::from_raw(handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_id_survives_js_number() {
        let id = TimerId::from_raw(42);
        let number = ScriptHandle::from(id).to_js();
        let back: TimerId = ScriptHandle::from_js(number).unwrap().into();
        assert_eq!(back, id);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        for value in [-1.0, 1.5, f64::NAN, f64::INFINITY, MAX_SAFE_INTEGER + 2.0] {
            assert_eq!(ScriptHandle::from_js(value), None, "{}", value);
        }
        assert_eq!(ScriptHandle::from_js(0.0), Some(ScriptHandle(0)));
    }
}
