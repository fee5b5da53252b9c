use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::Attribute;
use crate::string_pool::StringPool;

pub const TYPE_NULL: u8 = 0x00;
pub const TYPE_REFERENCE: u8 = 0x01;
pub const TYPE_ATTRIBUTE: u8 = 0x02;
pub const TYPE_STRING: u8 = 0x03;
pub const TYPE_FLOAT: u8 = 0x04;
pub const TYPE_DIMENSION: u8 = 0x05;
pub const TYPE_FRACTION: u8 = 0x06;
pub const TYPE_DYNAMIC_REFERENCE: u8 = 0x07;
pub const TYPE_INT_DEC: u8 = 0x10;
pub const TYPE_INT_HEX: u8 = 0x11;
pub const TYPE_INT_BOOLEAN: u8 = 0x12;
pub const TYPE_INT_COLOR_ARGB8: u8 = 0x1c;
pub const TYPE_INT_COLOR_RGB8: u8 = 0x1d;
pub const TYPE_INT_COLOR_ARGB4: u8 = 0x1e;
pub const TYPE_INT_COLOR_RGB4: u8 = 0x1f;

const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
const FRACTION_UNITS: [&str; 2] = ["%", "%p"];
const RADIX_MULTS: [f32; 4] = [
    1.0 / 256.0,
    1.0 / 32_768.0,
    1.0 / 8_388_608.0,
    1.0 / 2_147_483_648.0,
];

/// Typed attribute value, interpreted from `(data_type, data)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Reference(u32),
    Attribute(u32),
    String(String),
    Float(f32),
    Dimension(u32),
    Fraction(u32),
    Integer(i32),
    Hex(u32),
    Boolean(bool),
    Color(u32),
    Other { data_type: u8, data: u32 },
}

impl Value {
    /// Interprets an attribute, preferring its raw string when it has one.
    pub fn from_attribute(attribute: &Attribute, pool: &StringPool) -> Value {
        if let Some(raw) = pool.resolve(attribute.raw_value_id) {
            return Value::String(raw.to_string());
        }
        Value::from_typed(attribute.data_type(), attribute.typed_value, pool)
    }

    pub fn from_typed(data_type: u8, data: u32, pool: &StringPool) -> Value {
        match data_type {
            TYPE_NULL => Value::Null,
            TYPE_REFERENCE | TYPE_DYNAMIC_REFERENCE => Value::Reference(data),
            TYPE_ATTRIBUTE => Value::Attribute(data),
            TYPE_STRING => match pool.get(data) {
                Some(text) => Value::String(text.to_string()),
                None => Value::Other { data_type, data },
            },
            TYPE_FLOAT => Value::Float(f32::from_bits(data)),
            TYPE_DIMENSION => Value::Dimension(data),
            TYPE_FRACTION => Value::Fraction(data),
            TYPE_INT_DEC => Value::Integer(data as i32),
            TYPE_INT_HEX => Value::Hex(data),
            TYPE_INT_BOOLEAN => Value::Boolean(data != 0),
            TYPE_INT_COLOR_ARGB8..=TYPE_INT_COLOR_RGB4 => Value::Color(data),
            _ => Value::Other { data_type, data },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference_id(&self) -> Option<u32> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

/// Converts a complex (dimension or fraction) value to its float magnitude.
pub fn complex_to_float(data: u32) -> f32 {
    let mantissa = (data & 0xFFFF_FF00) as i32 as f32;
    mantissa * RADIX_MULTS[((data >> 4) & 0x3) as usize]
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Reference(id) => write!(f, "@0x{id:08x}"),
            Value::Attribute(id) => write!(f, "?0x{id:08x}"),
            Value::String(text) => f.write_str(text),
            Value::Float(value) => write!(f, "{value}"),
            Value::Dimension(data) => {
                let unit = DIMENSION_UNITS.get((data & 0xF) as usize).unwrap_or(&"");
                write!(f, "{}{unit}", complex_to_float(*data))
            }
            Value::Fraction(data) => {
                let unit = FRACTION_UNITS.get((data & 0xF) as usize).unwrap_or(&"");
                write!(f, "{}{unit}", complex_to_float(*data) * 100.0)
            }
            Value::Integer(value) => write!(f, "{value}"),
            Value::Hex(value) => write!(f, "0x{value:x}"),
            Value::Boolean(true) => f.write_str("true"),
            Value::Boolean(false) => f.write_str("false"),
            Value::Color(value) => write!(f, "#{value:08x}"),
            Value::Other { data_type, data } => write!(f, "{data_type:#04x}:{data:#x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::read_header;
    use crate::cursor::ByteCursor;
    use crate::tests::fixtures::{string_attribute, typed_attribute, utf16_pool_chunk};

    fn pool(strings: &[&str]) -> StringPool {
        let chunk = utf16_pool_chunk(strings);
        let mut cursor = ByteCursor::new(&chunk);
        let header = read_header(&mut cursor).unwrap();
        let mut body = cursor.sub_cursor(header.body_len(), "chunk body").unwrap();
        StringPool::decode(&mut body, &header).unwrap()
    }

    #[test]
    fn raw_string_wins_over_typed_data() {
        let pool = pool(&["name", "com.example.App"]);
        let attr = string_attribute(-1, 0, 1);
        assert_eq!(
            Value::from_attribute(&attr, &pool),
            Value::String("com.example.App".to_string())
        );
    }

    #[test]
    fn typed_values_are_interpreted() {
        let pool = pool(&["a"]);
        let value = |data_type, data| Value::from_attribute(&typed_attribute(-1, 0, data_type, data), &pool);
        assert_eq!(value(TYPE_REFERENCE, 0x7f01_0000), Value::Reference(0x7f01_0000));
        assert_eq!(value(TYPE_INT_DEC, 0xFFFF_FFFF), Value::Integer(-1));
        assert_eq!(value(TYPE_INT_BOOLEAN, 0xFFFF_FFFF), Value::Boolean(true));
        assert_eq!(value(TYPE_FLOAT, 1.5f32.to_bits()), Value::Float(1.5));
        assert_eq!(value(TYPE_INT_COLOR_RGB8, 0xff00_ff00), Value::Color(0xff00_ff00));
        assert_eq!(value(TYPE_STRING, 0), Value::String("a".to_string()));
        assert_eq!(
            value(0x42, 7),
            Value::Other {
                data_type: 0x42,
                data: 7,
            }
        );
    }

    #[test]
    fn renders_like_aapt_dump() {
        assert_eq!(Value::Reference(0x7f01_0000).to_string(), "@0x7f010000");
        assert_eq!(Value::Attribute(0x0101_0000).to_string(), "?0x01010000");
        assert_eq!(Value::Hex(0x10).to_string(), "0x10");
        assert_eq!(Value::Color(0xff00_ff00).to_string(), "#ff00ff00");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        // 16dip and 50% in complex encoding.
        assert_eq!(Value::Dimension((16 << 8) | 1).to_string(), "16dip");
        assert_eq!(complex_to_float(0x4000_0030), 0.5);
        assert_eq!(Value::Fraction(0x4000_0030).to_string(), "50%");
        assert_eq!(Value::Fraction(0x4000_0031).to_string(), "50%p");
    }
}
