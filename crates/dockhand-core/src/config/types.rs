//! Settings value types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How volume contents are reached when archiving or restoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Detect at startup: direct when the volumes root is visible, helper otherwise
    #[default]
    Auto,
    /// Walk the runtime's volume storage directory on the host
    Direct,
    /// Copy through a short-lived helper container
    Helper,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Auto => "auto",
            AccessMode::Direct => "direct",
            AccessMode::Helper => "helper",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AccessMode::Auto),
            "direct" => Ok(AccessMode::Direct),
            "helper" => Ok(AccessMode::Helper),
            other => Err(format!(
                "unknown access mode '{}' (expected auto, direct or helper)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_from_str() {
        assert_eq!("auto".parse::<AccessMode>().unwrap(), AccessMode::Auto);
        assert_eq!(" Helper ".parse::<AccessMode>().unwrap(), AccessMode::Helper);
        assert_eq!("DIRECT".parse::<AccessMode>().unwrap(), AccessMode::Direct);
        assert!("sideways".parse::<AccessMode>().is_err());
    }

    #[test]
    fn test_access_mode_serde() {
        let mode: AccessMode = serde_yaml_ng::from_str("helper").unwrap();
        assert_eq!(mode, AccessMode::Helper);
        assert_eq!(serde_yaml_ng::to_string(&AccessMode::Direct).unwrap().trim(), "direct");
    }
}
