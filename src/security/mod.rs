//! Credential handling for the gateway and for logs.
//!
//! [`BearerGuard`] gates the activity endpoint behind an optional shared
//! token, and [`redact`] keeps credentials out of log lines.

/// Redact sensitive values for safe logging. Shows first 4 chars + "***" suffix.
pub fn redact(value: &str) -> String {
    if value.len() <= 4 || !value.is_char_boundary(4) {
        "***".to_string()
    } else {
        format!("{}***", &value[..4])
    }
}

/// Length-independent comparison so token checks do not leak a matching prefix.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for (i, byte) in a.iter().enumerate() {
        let other = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}

/// Optional bearer-token gate for inbound activities.
#[derive(Debug, Clone, Default)]
pub struct BearerGuard {
    token: Option<String>,
}

impl BearerGuard {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToString::to_string),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// True when no token is configured or `presented` matches it.
    pub fn is_authorized(&self, presented: Option<&str>) -> bool {
        match &self.token {
            None => true,
            Some(expected) => presented
                .is_some_and(|p| constant_time_eq(p.as_bytes(), expected.as_bytes())),
        }
    }
}
