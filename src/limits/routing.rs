//! Routing values for the Riot API
//!
//! A routing value is the regional host token that forms part of the API URL
//! and namespaces every counter, policy, and cooldown key.

use crate::utils::error::{LimiterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream routing host identity
///
/// Platform routes address a single shard (e.g. `euw1`); regional routes
/// address a continent-wide cluster (e.g. `americas`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingVal {
    Br1,
    Eun1,
    Euw1,
    Jp1,
    Kr,
    La1,
    La2,
    Na1,
    Oc1,
    Ph2,
    Ru,
    Sg2,
    Th2,
    Tr1,
    Tw2,
    Vn2,
    Americas,
    Asia,
    Europe,
    Sea,
    Esports,
}

impl RoutingVal {
    /// Lowercase token as it appears in URLs and store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingVal::Br1 => "br1",
            RoutingVal::Eun1 => "eun1",
            RoutingVal::Euw1 => "euw1",
            RoutingVal::Jp1 => "jp1",
            RoutingVal::Kr => "kr",
            RoutingVal::La1 => "la1",
            RoutingVal::La2 => "la2",
            RoutingVal::Na1 => "na1",
            RoutingVal::Oc1 => "oc1",
            RoutingVal::Ph2 => "ph2",
            RoutingVal::Ru => "ru",
            RoutingVal::Sg2 => "sg2",
            RoutingVal::Th2 => "th2",
            RoutingVal::Tr1 => "tr1",
            RoutingVal::Tw2 => "tw2",
            RoutingVal::Vn2 => "vn2",
            RoutingVal::Americas => "americas",
            RoutingVal::Asia => "asia",
            RoutingVal::Europe => "europe",
            RoutingVal::Sea => "sea",
            RoutingVal::Esports => "esports",
        }
    }

    /// True for continent-wide regional routes
    pub fn is_regional(&self) -> bool {
        matches!(
            self,
            RoutingVal::Americas
                | RoutingVal::Asia
                | RoutingVal::Europe
                | RoutingVal::Sea
                | RoutingVal::Esports
        )
    }
}

impl fmt::Display for RoutingVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingVal {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "br1" => Ok(RoutingVal::Br1),
            "eun1" => Ok(RoutingVal::Eun1),
            "euw1" => Ok(RoutingVal::Euw1),
            "jp1" => Ok(RoutingVal::Jp1),
            "kr" => Ok(RoutingVal::Kr),
            "la1" => Ok(RoutingVal::La1),
            "la2" => Ok(RoutingVal::La2),
            "na1" => Ok(RoutingVal::Na1),
            "oc1" => Ok(RoutingVal::Oc1),
            "ph2" => Ok(RoutingVal::Ph2),
            "ru" => Ok(RoutingVal::Ru),
            "sg2" => Ok(RoutingVal::Sg2),
            "th2" => Ok(RoutingVal::Th2),
            "tr1" => Ok(RoutingVal::Tr1),
            "tw2" => Ok(RoutingVal::Tw2),
            "vn2" => Ok(RoutingVal::Vn2),
            "americas" => Ok(RoutingVal::Americas),
            "asia" => Ok(RoutingVal::Asia),
            "europe" => Ok(RoutingVal::Europe),
            "sea" => Ok(RoutingVal::Sea),
            "esports" => Ok(RoutingVal::Esports),
            other => Err(LimiterError::UnknownRouting(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_routes() {
        let routes = [
            RoutingVal::Br1,
            RoutingVal::Eun1,
            RoutingVal::Euw1,
            RoutingVal::Jp1,
            RoutingVal::Kr,
            RoutingVal::La1,
            RoutingVal::La2,
            RoutingVal::Na1,
            RoutingVal::Oc1,
            RoutingVal::Ph2,
            RoutingVal::Ru,
            RoutingVal::Sg2,
            RoutingVal::Th2,
            RoutingVal::Tr1,
            RoutingVal::Tw2,
            RoutingVal::Vn2,
            RoutingVal::Americas,
            RoutingVal::Asia,
            RoutingVal::Europe,
            RoutingVal::Sea,
            RoutingVal::Esports,
        ];
        for route in routes {
            assert_eq!(route.as_str().parse::<RoutingVal>().unwrap(), route);
        }
    }

    #[test]
    fn test_unknown_route_rejected() {
        let err = "euw9".parse::<RoutingVal>().unwrap_err();
        assert!(matches!(err, LimiterError::UnknownRouting(ref v) if v == "euw9"));
    }

    #[test]
    fn test_case_sensitive() {
        // Tokens are lowercase on the wire and in keys; anything else is unknown
        assert!("EUW1".parse::<RoutingVal>().is_err());
    }

    #[test]
    fn test_is_regional() {
        assert!(RoutingVal::Americas.is_regional());
        assert!(!RoutingVal::Euw1.is_regional());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&RoutingVal::Euw1).unwrap(),
            "\"euw1\""
        );
        let parsed: RoutingVal = serde_json::from_str("\"americas\"").unwrap();
        assert_eq!(parsed, RoutingVal::Americas);
    }
}
