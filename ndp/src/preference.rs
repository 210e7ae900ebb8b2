//! ルーター選択優先度 (RFC 4191)
//!
//! Router AdvertisementのPrfフィールドとRoute Informationオプションの
//! Preferenceフィールドで共用される2ビット値

use std::fmt::{self, Display};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    #[error("Reserved router selection preference value (10)")]
    ReservedPreference,
    #[error("Invalid router selection preference value: {0}")]
    InvalidPreference(u8),
}

/// ルーター選択優先度
///
/// High=01, Medium=00, Low=11の2ビットで符号化される。
/// 10は予約値であり、送受信ともに拒否される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preference {
    High,
    #[default]
    Medium,
    Low,
}

impl Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preference::High => write!(f, "high"),
            Preference::Medium => write!(f, "medium"),
            Preference::Low => write!(f, "low"),
        }
    }
}

impl From<Preference> for u8 {
    fn from(preference: Preference) -> Self {
        match preference {
            Preference::High => 0b01,
            Preference::Medium => 0b00,
            Preference::Low => 0b11,
        }
    }
}

impl TryFrom<u8> for Preference {
    type Error = PreferenceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(Preference::Medium),
            0b01 => Ok(Preference::High),
            0b11 => Ok(Preference::Low),
            0b10 => Err(PreferenceError::ReservedPreference),
            _ => Err(PreferenceError::InvalidPreference(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_round_trip() {
        // [正常系] 有効な値の相互変換
        for preference in [Preference::High, Preference::Medium, Preference::Low] {
            let value = u8::from(preference);
            assert_eq!(Preference::try_from(value).unwrap(), preference);
        }
        assert_eq!(u8::from(Preference::High), 0b01);
        assert_eq!(u8::from(Preference::Medium), 0b00);
        assert_eq!(u8::from(Preference::Low), 0b11);
    }

    #[test]
    fn test_preference_reserved() {
        // [異常系] 予約値10bは拒否
        assert!(matches!(
            Preference::try_from(0b10).unwrap_err(),
            PreferenceError::ReservedPreference
        ));

        // [異常系] 2ビットを超える値は拒否
        assert!(matches!(
            Preference::try_from(4).unwrap_err(),
            PreferenceError::InvalidPreference(4)
        ));
    }

    #[test]
    fn test_preference_default() {
        // [正常系] デフォルトはMedium
        assert_eq!(Preference::default(), Preference::Medium);
    }
}
