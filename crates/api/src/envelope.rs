//! Response envelope shared by every endpoint.
//!
//! Logical failures travel in `errcode`/`errmsg`; the HTTP status is always 200.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use userserver_core::ErrorCode;

/// Message used when a handler finishes without setting one.
pub const SUCCESS_MESSAGE: &str = "success";

/// Per-request response state, mutated by the handler and finalized once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEnvelope {
    code: Option<ErrorCode>,
    msg: String,
    request_id: String,
    cost_time: String,
    data: serde_json::Value,
}

/// The envelope as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub errcode: i64,
    pub errmsg: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "costTime")]
    pub cost_time: String,
    pub data: serde_json::Value,
}

impl ResponseEnvelope {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Wire code: `0` until a failure is recorded.
    pub fn code(&self) -> i64 {
        self.code.map(ErrorCode::code).unwrap_or(0)
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Record a failure with the code's default message.
    pub fn set_error(&mut self, code: ErrorCode) {
        self.set_error_with(code, code.message());
    }

    pub fn set_error_with(&mut self, code: ErrorCode, msg: impl Into<String>) {
        self.code = Some(code);
        self.msg = msg.into();
    }

    pub fn set_data<T: Serialize>(&mut self, data: &T) -> Result<(), serde_json::Error> {
        self.data = serde_json::to_value(data)?;
        Ok(())
    }

    /// Stamp the cost time and fill the default message.
    pub fn finalize(&mut self, elapsed: Duration) {
        self.cost_time = format_cost_time(elapsed);
        if self.msg.is_empty() {
            self.msg = SUCCESS_MESSAGE.to_string();
        }
    }

    pub fn to_wire(&self) -> WireEnvelope {
        WireEnvelope {
            errcode: self.code(),
            errmsg: self.msg.clone(),
            request_id: self.request_id.clone(),
            cost_time: self.cost_time.clone(),
            data: self.data.clone(),
        }
    }
}

/// Render an elapsed time as `<number><unit>`, right-aligned to width 4.
///
/// Units are `ns`, `µs`, `ms` and `s`; the fraction keeps every significant
/// digit, e.g. `1.234567ms`, `523.1µs`, `2.5s`, `  0s`.
pub fn format_cost_time(elapsed: Duration) -> String {
    let nanos = elapsed.as_nanos();
    let rendered = match nanos {
        0 => "0s".to_string(),
        n if n < 1_000 => format!("{n}ns"),
        n if n < 1_000_000 => with_fraction(n, 1_000, 3, "µs"),
        n if n < 1_000_000_000 => with_fraction(n, 1_000_000, 6, "ms"),
        n => with_fraction(n, 1_000_000_000, 9, "s"),
    };
    format!("{rendered:>4}")
}

fn with_fraction(nanos: u128, unit: u128, digits: usize, suffix: &str) -> String {
    let whole = nanos / unit;
    let frac = nanos % unit;
    if frac == 0 {
        return format!("{whole}{suffix}");
    }
    let frac = format!("{frac:0digits$}");
    format!("{whole}.{}{suffix}", frac.trim_end_matches('0'))
}

#[cfg(test)]
pub(crate) fn is_cost_time(s: &str) -> bool {
    let s = s.trim_start();
    let Some(number) = ["ns", "µs", "ms", "s"]
        .iter()
        .find_map(|unit| s.strip_suffix(unit))
    else {
        return false;
    };
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac_ok = parts
        .next()
        .map(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(true);
    !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit()) && frac_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_like_a_duration() {
        assert_eq!(format_cost_time(Duration::ZERO), "  0s");
        assert_eq!(format_cost_time(Duration::from_nanos(5)), " 5ns");
        assert_eq!(format_cost_time(Duration::from_nanos(523_100)), "523.1µs");
        assert_eq!(format_cost_time(Duration::from_micros(1_234)), "1.234ms");
        assert_eq!(format_cost_time(Duration::from_nanos(1_234_567)), "1.234567ms");
        assert_eq!(format_cost_time(Duration::from_millis(2_500)), "2.5s");
        assert_eq!(format_cost_time(Duration::from_secs(90)), " 90s");
    }

    #[test]
    fn finalize_defaults_message_to_success() {
        let mut env = ResponseEnvelope::new("rid");
        env.finalize(Duration::from_millis(1));
        assert_eq!(env.message(), SUCCESS_MESSAGE);
        assert_eq!(env.code(), 0);
    }

    #[test]
    fn finalize_keeps_handler_message() {
        let mut env = ResponseEnvelope::new("rid");
        env.set_error(ErrorCode::UserLogin);
        env.finalize(Duration::from_millis(1));
        assert_eq!(env.code(), 1005);
        assert_eq!(env.message(), "user login failed!");
    }

    #[test]
    fn wire_uses_fixed_field_names() {
        let mut env = ResponseEnvelope::new("rid-1");
        env.set_data(&serde_json::json!({ "userId": "u1" })).unwrap();
        env.finalize(Duration::from_micros(1_500));

        let json = serde_json::to_value(env.to_wire()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["costTime", "data", "errcode", "errmsg", "requestId"]);
        assert_eq!(json["errcode"], 0);
        assert_eq!(json["errmsg"], "success");
        assert_eq!(json["requestId"], "rid-1");
        assert_eq!(json["costTime"], "1.5ms");
        assert_eq!(json["data"]["userId"], "u1");
    }

    #[test]
    fn unset_data_is_null() {
        let env = ResponseEnvelope::new("rid");
        let json = serde_json::to_value(env.to_wire()).unwrap();
        assert!(json["data"].is_null());
    }

    proptest! {
        /// Property: serialize → parse preserves every field the handler set,
        /// and the cost time always reads as `<number><unit>`.
        #[test]
        fn wire_round_trip_preserves_fields(
            code_idx in 0usize..ErrorCode::ALL.len(),
            msg in "[a-zA-Z !]{0,24}",
            request_id in "[a-f0-9-]{1,36}",
            payload in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..5),
            nanos in 0u64..10_000_000_000u64,
        ) {
            let code = ErrorCode::ALL[code_idx];
            let mut env = ResponseEnvelope::new(request_id.clone());
            env.set_error_with(code, msg.clone());
            env.set_data(&payload).unwrap();
            env.finalize(Duration::from_nanos(nanos));

            let bytes = serde_json::to_vec(&env.to_wire()).unwrap();
            let parsed: WireEnvelope = serde_json::from_slice(&bytes).unwrap();

            prop_assert_eq!(parsed.errcode, code.code());
            let expected_msg = if msg.is_empty() { SUCCESS_MESSAGE.to_string() } else { msg };
            prop_assert_eq!(parsed.errmsg, expected_msg);
            prop_assert_eq!(parsed.request_id, request_id);
            prop_assert_eq!(parsed.data, serde_json::to_value(&payload).unwrap());
            prop_assert!(is_cost_time(&parsed.cost_time), "bad cost time {:?}", parsed.cost_time);
        }
    }
}
