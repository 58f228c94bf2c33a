//! Value codecs for the scalar types a [`TypedStore`](super::TypedStore) can hold.

use crate::aggregate::ThresholdBounds;
use crate::error::{Result, WinStoreError};
use crate::typed::ValueCodec;
use std::marker::PhantomData;
use std::num::IntErrorKind;

/// Booleans stored as `true` / `false`, projected to `1.0` / `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl ValueCodec for BoolCodec {
    type Value = bool;

    fn encode(&self, value: &bool) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(&self, raw: &str) -> Result<bool> {
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(WinStoreError::InvalidValue(format!(
                "parse bool: invalid syntax: {:?}",
                raw
            ))),
        }
    }

    fn project(&self, value: &bool) -> f64 {
        if *value {
            1.0
        } else {
            0.0
        }
    }

    /// Boolean windows average to a ratio, so every breakpoint must be in `[0, 1]`.
    fn check_thresholds(&self, bounds: &ThresholdBounds) -> Result<()> {
        if bounds.as_array().iter().all(|b| (0.0..=1.0).contains(b)) {
            Ok(())
        } else {
            Err(WinStoreError::InvalidThresholdBounds(
                "boolean thresholds must be between 0.0 and 1.0".to_string(),
            ))
        }
    }
}

/// Integers stored as decimal text.
///
/// Decoding is range checked against `T`.
#[derive(Debug, Clone, Copy)]
pub struct IntegerCodec<T>(PhantomData<fn() -> T>);

impl<T> IntegerCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for IntegerCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_integer_codec {
    ($($t:ty),* $(,)?) => {
        $(
            impl ValueCodec for IntegerCodec<$t> {
                type Value = $t;

                fn encode(&self, value: &$t) -> Result<String> {
                    Ok(value.to_string())
                }

                fn decode(&self, raw: &str) -> Result<$t> {
                    raw.parse::<$t>().map_err(|e| {
                        let kind = match e.kind() {
                            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "range",
                            _ => "syntax",
                        };
                        WinStoreError::InvalidValue(format!(
                            "parse {}: invalid {}: {:?}",
                            stringify!($t),
                            kind,
                            raw
                        ))
                    })
                }

                fn project(&self, value: &$t) -> f64 {
                    *value as f64
                }
            }
        )*
    };
}

impl_integer_codec!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Floating point values stored as their shortest round-trip decimal text.
///
/// Non-finite values are rejected both ways.
#[derive(Debug, Clone, Copy)]
pub struct FloatCodec<T>(PhantomData<fn() -> T>);

impl<T> FloatCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FloatCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_float_codec {
    ($($t:ty),* $(,)?) => {
        $(
            impl ValueCodec for FloatCodec<$t> {
                type Value = $t;

                fn encode(&self, value: &$t) -> Result<String> {
                    if !value.is_finite() {
                        return Err(WinStoreError::InvalidValue(format!(
                            "non-finite {}: {}",
                            stringify!($t),
                            value
                        )));
                    }
                    Ok(value.to_string())
                }

                fn decode(&self, raw: &str) -> Result<$t> {
                    let value = raw.parse::<$t>().map_err(|_| {
                        WinStoreError::InvalidValue(format!(
                            "parse {}: invalid syntax: {:?}",
                            stringify!($t),
                            raw
                        ))
                    })?;
                    if !value.is_finite() {
                        return Err(WinStoreError::InvalidValue(format!(
                            "parse {}: invalid range: {:?}",
                            stringify!($t),
                            raw
                        )));
                    }
                    Ok(value)
                }

                fn project(&self, value: &$t) -> f64 {
                    f64::from(*value)
                }
            }
        )*
    };
}

impl_float_codec!(f32, f64);

/// Strings with optional character and value restrictions, projected to their
/// byte length.
#[derive(Debug, Clone, Default)]
pub struct StringCodec {
    invalid_chars: Vec<char>,
    valid_values: Vec<String>,
}

impl StringCodec {
    /// Creates a codec accepting any single-line string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects values containing any of `chars`.
    pub fn with_invalid_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.invalid_chars = chars.into_iter().collect();
        self
    }

    /// Accepts only the listed values. An empty list accepts everything.
    pub fn with_valid_values<S: Into<String>>(
        mut self,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.valid_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self, raw: &str) -> Result<()> {
        if let Some(c) = self.invalid_chars.iter().find(|c| raw.contains(**c)) {
            return Err(WinStoreError::InvalidValue(format!(
                "invalid character: {:?}",
                c
            )));
        }
        if !self.valid_values.is_empty() && !self.valid_values.iter().any(|v| v == raw) {
            return Err(WinStoreError::InvalidValue(format!(
                "invalid value: {:?}",
                raw
            )));
        }
        Ok(())
    }
}

impl ValueCodec for StringCodec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<String> {
        self.validate(value)?;
        Ok(value.clone())
    }

    fn decode(&self, raw: &str) -> Result<String> {
        self.validate(raw)?;
        Ok(raw.to_string())
    }

    fn project(&self, value: &String) -> f64 {
        value.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_codec() {
        let codec = BoolCodec;
        assert_eq!(codec.encode(&true).unwrap(), "true");
        assert!(!codec.decode("false").unwrap());
        assert!(matches!(codec.decode("TRUE"), Err(WinStoreError::InvalidValue(_))));
        assert_eq!(codec.project(&true), 1.0);

        assert!(codec
            .check_thresholds(&ThresholdBounds::new(0.0, 0.25, 0.75, 1.0))
            .is_ok());
        assert!(matches!(
            codec.check_thresholds(&ThresholdBounds::new(-0.1, 0.25, 0.75, 1.0)),
            Err(WinStoreError::InvalidThresholdBounds(_))
        ));
        assert!(matches!(
            codec.check_thresholds(&ThresholdBounds::new(0.0, 0.25, 0.75, 1.5)),
            Err(WinStoreError::InvalidThresholdBounds(_))
        ));
    }

    #[test]
    fn test_integer_codec_range() {
        let codec = IntegerCodec::<i8>::new();
        assert_eq!(codec.encode(&-128).unwrap(), "-128");
        assert_eq!(codec.decode("127").unwrap(), 127);
        let err = codec.decode("128").unwrap_err().to_string();
        assert!(err.contains("invalid range"), "{err}");
        let err = codec.decode("12a").unwrap_err().to_string();
        assert!(err.contains("invalid syntax"), "{err}");

        let codec = IntegerCodec::<u16>::new();
        assert!(codec.decode("-1").is_err());
        assert_eq!(codec.decode("65535").unwrap(), u16::MAX);
        assert_eq!(codec.project(&500), 500.0);

        let codec = IntegerCodec::<u64>::default();
        assert_eq!(codec.decode(&u64::MAX.to_string()).unwrap(), u64::MAX);
    }

    #[test]
    fn test_float_codec() {
        let codec = FloatCodec::<f64>::new();
        assert_eq!(codec.encode(&0.1).unwrap(), "0.1");
        assert_eq!(codec.decode("-2.5").unwrap(), -2.5);
        assert!(codec.encode(&f64::NAN).is_err());
        assert!(codec.decode("inf").is_err());
        assert!(codec.decode("abc").is_err());

        let codec = FloatCodec::<f32>::new();
        let raw = codec.encode(&0.1f32).unwrap();
        assert_eq!(codec.decode(&raw).unwrap(), 0.1f32);
        assert!(codec.decode("1e39").is_err());
        assert_eq!(codec.project(&0.5f32), 0.5);
    }

    #[test]
    fn test_string_codec_restrictions() {
        let codec = StringCodec::new()
            .with_invalid_chars(['#', '!'])
            .with_valid_values(["on", "off", "o#"]);

        assert_eq!(codec.encode(&"on".to_string()).unwrap(), "on");
        assert!(matches!(
            codec.encode(&"maybe".to_string()),
            Err(WinStoreError::InvalidValue(_))
        ));
        assert!(matches!(codec.decode("o#"), Err(WinStoreError::InvalidValue(_))));
        assert_eq!(codec.project(&"off".to_string()), 3.0);

        let open = StringCodec::new();
        assert_eq!(open.decode("anything goes").unwrap(), "anything goes");
    }
}
