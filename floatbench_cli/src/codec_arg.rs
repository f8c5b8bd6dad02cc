use std::fmt;
use std::str::FromStr;

use floatbench_codecs::CodecKind;
use floatbench_core::{CodecConfig, ConfigError};

/// `--codec` value: a codec name followed by its positional options,
/// e.g. `BitTruncation,12,1` or `SZ3,0,abs,1e-3`.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecArg {
    pub kind: CodecKind,
    pub options: CodecConfig,
}

impl FromStr for CodecArg {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let kind: CodecKind = parts.next().unwrap_or_default().parse()?;
        let values: Vec<&str> = parts.collect();
        let keys = kind.option_keys();
        if values.len() != keys.len() {
            return Err(ConfigError::InvalidValue {
                key: "codec",
                value: s.to_string(),
                reason: format!("{} takes {} options: {}", kind, keys.len(), keys.join(",")),
            });
        }
        let options = keys
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(Self { kind, options })
    }
}

impl fmt::Display for CodecArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for key in self.kind.option_keys() {
            write!(f, ",{}", self.options.get(*key).map(String::as_str).unwrap_or(""))?;
        }
        Ok(())
    }
}
