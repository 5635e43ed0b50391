use chrono::{DateTime, Utc};
use uuid::Uuid;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Builds `PREFIX-<base36 millis>-<8 hex>` receipt numbers.
#[derive(Debug, Clone)]
pub struct ReceiptGenerator {
    prefix: String,
}

impl ReceiptGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&self) -> String {
        self.generate_at(Utc::now())
    }

    pub fn generate_at(&self, now: DateTime<Utc>) -> String {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.prefix,
            to_base36(millis),
            random[..8].to_ascii_uppercase()
        )
    }
}

impl Default for ReceiptGenerator {
    fn default() -> Self {
        Self::new("DCU")
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
