//! Decimal byte units for human-readable sizes

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalByteUnit {
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
}

impl DecimalByteUnit {
    const ALL: [DecimalByteUnit; 5] = [
        DecimalByteUnit::Byte,
        DecimalByteUnit::Kilobyte,
        DecimalByteUnit::Megabyte,
        DecimalByteUnit::Gigabyte,
        DecimalByteUnit::Terabyte,
    ];

    pub fn bytes(self) -> u64 {
        match self {
            DecimalByteUnit::Byte => 1,
            DecimalByteUnit::Kilobyte => 1_000,
            DecimalByteUnit::Megabyte => 1_000_000,
            DecimalByteUnit::Gigabyte => 1_000_000_000,
            DecimalByteUnit::Terabyte => 1_000_000_000_000,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            DecimalByteUnit::Byte => "B",
            DecimalByteUnit::Kilobyte => "kB",
            DecimalByteUnit::Megabyte => "MB",
            DecimalByteUnit::Gigabyte => "GB",
            DecimalByteUnit::Terabyte => "TB",
        }
    }
}

/// A byte count expressed in the largest decimal unit it fills at least once
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeInformation {
    pub bytes: u64,
    pub unit: DecimalByteUnit,
    pub value: f64,
}

impl SizeInformation {
    pub fn from_bytes(bytes: u64) -> Self {
        let unit = DecimalByteUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|unit| bytes >= unit.bytes())
            .unwrap_or(DecimalByteUnit::Byte);
        Self {
            bytes,
            unit,
            value: bytes as f64 / unit.bytes() as f64,
        }
    }
}

impl fmt::Display for SizeInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            DecimalByteUnit::Byte => write!(f, "{} {}", self.bytes, self.unit.symbol()),
            unit => write!(f, "{:.2} {}", self.value, unit.symbol()),
        }
    }
}
