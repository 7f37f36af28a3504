//! Binary layout of the kernel `input_event` record
//!
//! The layout depends on the device kernel's word size, not on the host, so it
//! is always chosen explicitly rather than inferred from the capture.

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};

/// Byte order of the integer fields in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Storage type of a single record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    U16,
    I32,
    I64,
}

impl FieldKind {
    /// Width of the field in bytes
    pub const fn width(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::I32 => 4,
            Self::I64 => 8,
        }
    }
}

/// Position and type of one named field inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    /// One past the last byte this field occupies
    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }

    /// Read this field from a record chunk, widened to i64
    pub fn read(&self, chunk: &[u8], order: ByteOrder) -> i64 {
        let bytes = &chunk[self.offset..self.end()];
        match (self.kind, order) {
            (FieldKind::U16, ByteOrder::Little) => {
                u16::from_le_bytes([bytes[0], bytes[1]]) as i64
            }
            (FieldKind::U16, ByteOrder::Big) => {
                u16::from_be_bytes([bytes[0], bytes[1]]) as i64
            }
            (FieldKind::I32, ByteOrder::Little) => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64
            }
            (FieldKind::I32, ByteOrder::Big) => {
                i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64
            }
            (FieldKind::I64, ByteOrder::Little) => i64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
            (FieldKind::I64, ByteOrder::Big) => i64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    /// Write a value into this field's slot, truncating to the field width
    pub fn write(&self, chunk: &mut [u8], value: i64, order: ByteOrder) {
        let slot = &mut chunk[self.offset..self.end()];
        match (self.kind, order) {
            (FieldKind::U16, ByteOrder::Little) => {
                slot.copy_from_slice(&(value as u16).to_le_bytes())
            }
            (FieldKind::U16, ByteOrder::Big) => slot.copy_from_slice(&(value as u16).to_be_bytes()),
            (FieldKind::I32, ByteOrder::Little) => {
                slot.copy_from_slice(&(value as i32).to_le_bytes())
            }
            (FieldKind::I32, ByteOrder::Big) => slot.copy_from_slice(&(value as i32).to_be_bytes()),
            (FieldKind::I64, ByteOrder::Little) => slot.copy_from_slice(&value.to_le_bytes()),
            (FieldKind::I64, ByteOrder::Big) => slot.copy_from_slice(&value.to_be_bytes()),
        }
    }
}

/// Named decode configuration for `struct input_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordLayout {
    pub name: &'static str,
    pub record_size: usize,
    pub byte_order: ByteOrder,
    pub seconds: FieldSpec,
    pub microseconds: FieldSpec,
    pub event_type: FieldSpec,
    pub event_code: FieldSpec,
    pub event_value: FieldSpec,
}

impl RecordLayout {
    /// 64-bit kernels: two 8-byte `timeval` words, 24 bytes per record
    pub const LP64: RecordLayout = RecordLayout {
        name: "lp64",
        record_size: 24,
        byte_order: ByteOrder::Little,
        seconds: FieldSpec::new("tv_sec", 0, FieldKind::I64),
        microseconds: FieldSpec::new("tv_usec", 8, FieldKind::I64),
        event_type: FieldSpec::new("type", 16, FieldKind::U16),
        event_code: FieldSpec::new("code", 18, FieldKind::U16),
        event_value: FieldSpec::new("value", 20, FieldKind::I32),
    };

    /// 32-bit kernels: two 4-byte `timeval` words, 16 bytes per record
    pub const ILP32: RecordLayout = RecordLayout {
        name: "ilp32",
        record_size: 16,
        byte_order: ByteOrder::Little,
        seconds: FieldSpec::new("tv_sec", 0, FieldKind::I32),
        microseconds: FieldSpec::new("tv_usec", 4, FieldKind::I32),
        event_type: FieldSpec::new("type", 8, FieldKind::U16),
        event_code: FieldSpec::new("code", 10, FieldKind::U16),
        event_value: FieldSpec::new("value", 12, FieldKind::I32),
    };

    /// Parse a layout name as accepted on the command line
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "64" | "lp64" | "arm64" | "aarch64" | "x86_64" => Ok(Self::LP64),
            "32" | "ilp32" | "arm" | "armv7" | "x86" => Ok(Self::ILP32),
            other => Err(ReplayError::InvalidConfiguration(format!(
                "unknown record layout: {}",
                other
            ))),
        }
    }

    /// All fields in declaration order
    pub fn fields(&self) -> [FieldSpec; 5] {
        [
            self.seconds,
            self.microseconds,
            self.event_type,
            self.event_code,
            self.event_value,
        ]
    }

    /// Check that every field fits inside the record and none overlap
    pub fn validate(&self) -> Result<()> {
        if self.record_size == 0 {
            return Err(ReplayError::InvalidConfiguration(format!(
                "layout {} has zero record size",
                self.name
            )));
        }

        let mut fields = self.fields();
        fields.sort_by_key(|f| f.offset);

        for field in &fields {
            if field.end() > self.record_size {
                return Err(ReplayError::InvalidConfiguration(format!(
                    "field {} of layout {} ends at byte {} past record size {}",
                    field.name,
                    self.name,
                    field.end(),
                    self.record_size
                )));
            }
        }
        for pair in fields.windows(2) {
            if pair[0].end() > pair[1].offset {
                return Err(ReplayError::InvalidConfiguration(format!(
                    "fields {} and {} of layout {} overlap",
                    pair[0].name, pair[1].name, self.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::LP64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(RecordLayout::LP64.validate().is_ok());
        assert!(RecordLayout::ILP32.validate().is_ok());
        assert_eq!(RecordLayout::default(), RecordLayout::LP64);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(RecordLayout::from_name("64").unwrap(), RecordLayout::LP64);
        assert_eq!(RecordLayout::from_name("ILP32").unwrap(), RecordLayout::ILP32);
        assert!(matches!(
            RecordLayout::from_name("16"),
            Err(ReplayError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_overlapping_fields_rejected() {
        let mut layout = RecordLayout::ILP32;
        layout.event_code = FieldSpec::new("code", 9, FieldKind::U16);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_field_past_end_rejected() {
        let mut layout = RecordLayout::ILP32;
        layout.record_size = 14;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_field_read_signed_value() {
        let field = FieldSpec::new("value", 0, FieldKind::I32);
        let bytes = (-5i32).to_le_bytes();
        assert_eq!(field.read(&bytes, ByteOrder::Little), -5);
        let bytes = (-5i32).to_be_bytes();
        assert_eq!(field.read(&bytes, ByteOrder::Big), -5);
    }
}
