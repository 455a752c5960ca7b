use std::fmt;
use std::str::FromStr;

/// Identifier of a tenant (restaurant).
///
/// Only strictly positive values are valid. There is deliberately no "zero" or
/// default tenant: an unknown tenant is modeled as an absent identifier on
/// [`crate::TenantContext`], never as a placeholder id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Returns `None` for zero or negative values.
    #[must_use]
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tenant id: {0:?}")]
pub struct InvalidTenantId(pub String);

impl FromStr for TenantId {
    type Err = InvalidTenantId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidTenantId(s.to_owned()))
    }
}

impl<'de> serde::Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).ok_or_else(|| serde::de::Error::custom("tenant id must be positive"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_ids() {
        assert!(TenantId::new(0).is_none());
        assert!(TenantId::new(-3).is_none());
        assert_eq!(TenantId::new(7).map(TenantId::get), Some(7));
    }

    #[test]
    fn parses_trimmed_numbers_only() {
        assert_eq!(" 12 ".parse::<TenantId>().ok(), TenantId::new(12));
        assert!("abc".parse::<TenantId>().is_err());
        assert!("0".parse::<TenantId>().is_err());
        assert!("".parse::<TenantId>().is_err());
    }

    #[test]
    fn deserialize_rejects_zero() {
        let ok: Result<TenantId, _> = serde_json::from_str("5");
        assert_eq!(ok.ok(), TenantId::new(5));
        let bad: Result<TenantId, _> = serde_json::from_str("0");
        assert!(bad.is_err());
    }
}
