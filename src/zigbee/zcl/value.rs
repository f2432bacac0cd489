/// Attribute value as handed across the stack boundary.
///
/// Char strings keep their ZCL length prefix; use
/// [`decode_char_string`](super::decode_char_string) to get the text back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    S8(i8),
    S16(i16),
    S32(i32),
    Enum8(u8),
    Bitmap8(u8),
    Bitmap16(u16),
    CharString(Vec<u8>),
    UtcTime(u32),
    Ieee([u8; 8]),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 8-bit unsigned view, also covering enum and bitmap encodings.
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) | Self::Enum8(v) | Self::Bitmap8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) | Self::Bitmap16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) | Self::UtcTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::S16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::S32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char_string(&self) -> Option<&[u8]> {
        match self {
            Self::CharString(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn as_ieee(&self) -> Option<[u8; 8]> {
        match self {
            Self::Ieee(addr) => Some(*addr),
            _ => None,
        }
    }
}
