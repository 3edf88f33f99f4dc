//! Cloud provider selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FerryError;

/// Cloud object storage a call is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// Azure-style blob service
    Azure,
    /// S3-compatible object store
    #[default]
    Aws,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Azure => "Azure",
            Provider::Aws => "Aws",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "azure" | "blob" => Ok(Provider::Azure),
            "aws" | "s3" => Ok(Provider::Aws),
            other => Err(FerryError::Config(format!("unknown cloud provider: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Azure".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!("AWS".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!("s3".parse::<Provider>().unwrap(), Provider::Aws);
        assert!("gcs".parse::<Provider>().is_err());
    }

    #[test]
    fn test_default_is_aws() {
        assert_eq!(Provider::default(), Provider::Aws);
    }
}
