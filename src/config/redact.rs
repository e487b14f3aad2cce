// src/config/redact.rs

//! Masking of secret-looking values before they are printed or logged.
//!
//! Two rules apply:
//! - a parameter whose name looks sensitive (`*Password*`, `*Secret*`,
//!   `*Key*`, `*Token*`, ...) has its whole value replaced;
//! - inside any text, `name=value` or `name: value` pairs with a sensitive
//!   name have the value replaced. This covers command lines such as
//!   `--parameters=AccessToken=abc`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::model::{ParameterValue, Parameters};

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_WORDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "secret",
    "key",
    "token",
    "credential",
    "connectionstring",
    "sas",
];

static INLINE_SECRET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([A-Za-z0-9_\-]*(?:password|passwd|pwd|secret|key|token|credential|connectionstring|sas)[A-Za-z0-9_\-]*)(\s*[=:]\s*)([^\s,;&]+)",
    )
    .ok()
});

/// Whether a parameter with this name holds a secret.
pub fn is_sensitive_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_WORDS.iter().any(|word| name.contains(word))
}

/// `text` with the values of sensitive `name=value` pairs masked.
pub fn obscure_text(text: &str) -> Cow<'_, str> {
    match INLINE_SECRET.as_ref() {
        Some(pattern) => pattern.replace_all(text, format!("${{1}}${{2}}{REDACTED}")),
        None => Cow::Borrowed(text),
    }
}

/// Copy of `parameters` that is safe to print. The input is left untouched.
pub fn obscure_secrets(parameters: &Parameters) -> Parameters {
    parameters
        .iter()
        .map(|(key, value)| {
            let masked = if is_sensitive_name(key) {
                ParameterValue::String(REDACTED.to_string())
            } else {
                match value.as_str() {
                    Some(text) => ParameterValue::String(obscure_text(text).into_owned()),
                    None => value.clone(),
                }
            };
            (key.clone(), masked)
        })
        .collect()
}
