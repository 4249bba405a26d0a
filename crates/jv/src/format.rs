//! Pluggable string-format checking and casting (SPEC_FULL.md §4.5).
//!
//! Built-in validators cover the formats the corpus's own `format.rs` checks by hand
//! (`date`, `email`, `ipv4`/`ipv6`, ...); a [`FormatRegistry`] tries registered modules
//! in order and the first one advertising a given format handles it.
use std::{net::Ipv4Addr, net::Ipv6Addr, str::FromStr};

use email_address::EmailAddress;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// A plug-in that knows how to check (and optionally cast) one or more string formats.
pub trait FormatValidator: Send + Sync {
    /// Format names this module handles.
    fn supported_formats(&self) -> &[&str];

    /// Whether `data` is of a type this format even applies to. The default - all
    /// formats apply only to strings - matches every format in the JSON Schema spec.
    fn applies_to_type(&self, _format: &str, data: &Value) -> bool {
        data.is_string()
    }

    /// Check (and, when cast is requested, coerce) `data` against `format`.
    fn validate_cast(&self, format: &str, data: &Value) -> Result<Value, String>;
}

/// Ordered collection of [`FormatValidator`] modules. First registrant for a format wins.
pub struct FormatRegistry {
    modules: Vec<Box<dyn FormatValidator>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry { modules: vec![Box::new(BuiltinFormats)] }
    }
}

impl FormatRegistry {
    #[must_use]
    pub fn new() -> Self {
        FormatRegistry { modules: Vec::new() }
    }

    #[must_use]
    pub fn with_builtins() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn FormatValidator>) {
        self.modules.push(module);
    }

    fn find(&self, format: &str) -> Option<&dyn FormatValidator> {
        self.modules
            .iter()
            .find(|m| m.supported_formats().contains(&format))
            .map(AsRef::as_ref)
    }

    #[must_use]
    pub fn is_known(&self, format: &str) -> bool {
        self.find(format).is_some()
    }

    /// `Ok(())` if valid or the format is unknown to every module (an unrecognized
    /// format is annotation-only and never fails validation); `Err` with the rejection
    /// reason otherwise.
    pub fn check(&self, format: &str, data: &Value) -> Result<(), String> {
        match self.find(format) {
            None => Ok(()),
            Some(module) if !module.applies_to_type(format, data) => Ok(()),
            Some(module) => module.validate_cast(format, data).map(|_| ()),
        }
    }

    #[must_use]
    pub fn validate_cast(&self, format: &str, data: &Value) -> Option<Value> {
        let module = self.find(format)?;
        if !module.applies_to_type(format, data) {
            return Some(data.clone());
        }
        module.validate_cast(format, data).ok()
    }
}

struct BuiltinFormats;

const SUPPORTED: &[&str] = &[
    "date",
    "date-time",
    "email",
    "idn-email",
    "uuid",
    "ipv4",
    "ipv6",
    "uri",
    "regex",
    "hostname",
    "idn-hostname",
    "json-pointer",
];

impl FormatValidator for BuiltinFormats {
    fn supported_formats(&self) -> &[&str] {
        SUPPORTED
    }

    fn validate_cast(&self, format: &str, data: &Value) -> Result<Value, String> {
        let Value::String(s) = data else {
            return Ok(data.clone());
        };
        match format {
            "date" => {
                if is_valid_date(s) {
                    Ok(date_components(s))
                } else {
                    Err(format!("'{s}' is not a valid date"))
                }
            }
            "date-time" => {
                if is_valid_date_time(s) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid date-time"))
                }
            }
            "email" => {
                if EmailAddress::from_str(s).is_ok() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid email address"))
                }
            }
            "uuid" => {
                let mut out = [0u8; 16];
                if uuid_simd::parse_hyphenated(s.as_bytes(), uuid_simd::Out::from_mut(&mut out)).is_ok() {
                    Ok(Value::String(s.to_ascii_lowercase()))
                } else {
                    Err(format!("'{s}' is not a valid uuid"))
                }
            }
            "ipv4" => {
                if Ipv4Addr::from_str(s).is_ok() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid IPv4 address"))
                }
            }
            "ipv6" => {
                if Ipv6Addr::from_str(s).is_ok() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid IPv6 address"))
                }
            }
            "uri" => {
                if jv_referencing::uri::from_str(s).is_ok() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid URI"))
                }
            }
            "regex" => {
                if Regex::new(s).is_ok() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid regular expression"))
                }
            }
            "hostname" => {
                if is_valid_hostname(s) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid hostname"))
                }
            }
            "idn-hostname" => match idna::domain_to_ascii(s) {
                Ok(ascii) if is_valid_hostname(&ascii) => Ok(Value::String(s.clone())),
                _ => Err(format!("'{s}' is not a valid internationalized hostname")),
            },
            "idn-email" => {
                if s.split_once('@').is_some_and(|(local, domain)| {
                    !local.is_empty() && idna::domain_to_ascii(domain).is_ok()
                }) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid internationalized email address"))
                }
            }
            "json-pointer" => {
                if JSON_POINTER_RE.is_match(s).unwrap_or(false) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(format!("'{s}' is not a valid JSON Pointer"))
                }
            }
            _ => Ok(data.clone()),
        }
    }
}

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("valid regex"));

fn date_components(date: &str) -> Value {
    json!({
        "year": date[0..4].parse::<u32>().unwrap_or_default(),
        "month": date[5..7].parse::<u32>().unwrap_or_default(),
        "day": date[8..10].parse::<u32>().unwrap_or_default(),
    })
}

fn is_valid_date(date: &str) -> bool {
    if date.len() != 10 {
        return false;
    }
    let bytes = date.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' || !bytes.iter().enumerate().all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit()) {
        return false;
    }
    let year = date[0..4].parse::<u16>().unwrap_or(0);
    let month = date[5..7].parse::<u8>().unwrap_or(0);
    let day = date[8..10].parse::<u8>().unwrap_or(0);
    if !(1..=12).contains(&month) {
        return false;
    }
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => day >= 1 && day <= 31,
        4 | 6 | 9 | 11 => day >= 1 && day <= 30,
        2 if is_leap_year(year) => day >= 1 && day <= 29,
        2 => day >= 1 && day <= 28,
        _ => false,
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn is_valid_date_time(value: &str) -> bool {
    let Some((date_part, rest)) = value.split_once(['T', 't']) else { return false };
    if !is_valid_date(date_part) {
        return false;
    }
    let rest = rest.trim_end_matches(['Z', 'z']);
    let time_part = rest.split(['+', '-']).next().unwrap_or(rest);
    let mut segments = time_part.splitn(2, '.');
    let hms = segments.next().unwrap_or("");
    let mut hms_parts = hms.split(':');
    let (Some(h), Some(m), Some(s)) = (hms_parts.next(), hms_parts.next(), hms_parts.next()) else {
        return false;
    };
    let (Ok(h), Ok(m), Ok(s)) = (h.parse::<u8>(), m.parse::<u8>(), s.parse::<u8>()) else {
        return false;
    };
    h < 24 && m < 60 && s <= 60
}

fn is_valid_hostname(hostname: &str) -> bool {
    !(hostname.ends_with('-')
        || hostname.starts_with('-')
        || hostname.is_empty()
        || hostname.chars().count() > 255
        || hostname.chars().any(|c| !(c.is_alphanumeric() || c == '-' || c == '.'))
        || hostname.split('.').any(|part| part.chars().count() > 63))
}
