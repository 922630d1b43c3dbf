//! Store key codec
//!
//! Bidirectional mapping between quota facts and the structured Redis keys
//! they live under. Key layout is an external contract (operator dashboards
//! read these keys directly), so `encode` and `decode` must stay exact
//! inverses of each other.
//!
//! Templates:
//!
//! - `riot:v1:policy:<route>:<endpoint>:<limit_type>:windows`
//! - `riot:v1:policy:<route>:<endpoint>:<limit_type>:window:<W>:limit`
//! - `riot:v1:authoritative:<route>:<endpoint>:<limit_type>:window:<W>`
//! - `lol_api:v1:live:<route>:<endpoint>:<limit_type>:window:<W>`
//! - `lol_api:v1:cooldown:<route>:<limit_type>` (application, service)
//! - `lol_api:v1:cooldown:<route>:<endpoint>:<limit_type>` (method)

use crate::limits::entry::LimitType;
use crate::limits::routing::RoutingVal;
use crate::utils::error::{LimiterError, Result};

/// Namespace for policy and authoritative-counter keys
const NS_RIOT: &str = "riot";
/// Namespace for live-counter and cooldown keys
const NS_LOL_API: &str = "lol_api";
/// Key schema version segment
const VERSION: &str = "v1";

/// Which key family a [`StoreKey`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Comma-separated window set for one scope
    PolicyWindows,
    /// Per-window request ceiling
    PolicyLimit,
    /// Node-side counter incremented by admission
    LiveCounter,
    /// Upstream-reported counter observation
    AuthoritativeCounter,
    /// Server-imposed back-off marker
    Cooldown,
}

/// Structured form of a store key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey {
    /// Key family
    pub kind: KeyKind,
    /// Routing value segment
    pub routing: RoutingVal,
    /// Endpoint segment; absent only on application/service cooldowns
    pub endpoint: Option<String>,
    /// Quota scope segment
    pub limit_type: LimitType,
    /// Window segment for window-scoped families
    pub window_sec: Option<u64>,
}

impl StoreKey {
    /// Policy-windows key for `(routing, endpoint, limit_type)`
    pub fn policy_windows(
        routing: RoutingVal,
        endpoint: &str,
        limit_type: LimitType,
    ) -> Self {
        Self {
            kind: KeyKind::PolicyWindows,
            routing,
            endpoint: Some(endpoint.to_string()),
            limit_type,
            window_sec: None,
        }
    }

    /// Policy-limit key for one window
    pub fn policy_limit(
        routing: RoutingVal,
        endpoint: &str,
        limit_type: LimitType,
        window_sec: u64,
    ) -> Self {
        Self {
            kind: KeyKind::PolicyLimit,
            routing,
            endpoint: Some(endpoint.to_string()),
            limit_type,
            window_sec: Some(window_sec),
        }
    }

    /// Live-counter key for one window
    pub fn live_counter(
        routing: RoutingVal,
        endpoint: &str,
        limit_type: LimitType,
        window_sec: u64,
    ) -> Self {
        Self {
            kind: KeyKind::LiveCounter,
            routing,
            endpoint: Some(endpoint.to_string()),
            limit_type,
            window_sec: Some(window_sec),
        }
    }

    /// Authoritative-counter key for one window
    pub fn authoritative_counter(
        routing: RoutingVal,
        endpoint: &str,
        limit_type: LimitType,
        window_sec: u64,
    ) -> Self {
        Self {
            kind: KeyKind::AuthoritativeCounter,
            routing,
            endpoint: Some(endpoint.to_string()),
            limit_type,
            window_sec: Some(window_sec),
        }
    }

    /// Cooldown key; the endpoint segment is present only for method scope
    pub fn cooldown(
        routing: RoutingVal,
        endpoint: &str,
        limit_type: LimitType,
    ) -> Self {
        let endpoint = match limit_type {
            LimitType::Method => Some(endpoint.to_string()),
            LimitType::Application | LimitType::Service => None,
        };
        Self {
            kind: KeyKind::Cooldown,
            routing,
            endpoint,
            limit_type,
            window_sec: None,
        }
    }

    /// Render the key string for this family
    pub fn encode(&self) -> String {
        let route = self.routing.as_str();
        let scope = self.limit_type.as_str();
        match self.kind {
            KeyKind::PolicyWindows => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                format!("{NS_RIOT}:{VERSION}:policy:{route}:{endpoint}:{scope}:windows")
            }
            KeyKind::PolicyLimit => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                let window = self.window_sec.unwrap_or_default();
                format!(
                    "{NS_RIOT}:{VERSION}:policy:{route}:{endpoint}:{scope}:window:{window}:limit"
                )
            }
            KeyKind::AuthoritativeCounter => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                let window = self.window_sec.unwrap_or_default();
                format!(
                    "{NS_RIOT}:{VERSION}:authoritative:{route}:{endpoint}:{scope}:window:{window}"
                )
            }
            KeyKind::LiveCounter => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                let window = self.window_sec.unwrap_or_default();
                format!(
                    "{NS_LOL_API}:{VERSION}:live:{route}:{endpoint}:{scope}:window:{window}"
                )
            }
            KeyKind::Cooldown => match self.endpoint {
                Some(ref endpoint) => {
                    format!("{NS_LOL_API}:{VERSION}:cooldown:{route}:{endpoint}:{scope}")
                }
                None => format!("{NS_LOL_API}:{VERSION}:cooldown:{route}:{scope}"),
            },
        }
    }

    /// Parse a key string back into its structured form
    ///
    /// Dispatch is on the `(namespace, version, mode)` prefix before arity,
    /// so cooldown keys can never be swallowed by a window-scoped template.
    pub fn decode(key: &str) -> Result<StoreKey> {
        let malformed = || LimiterError::KeyMalformed {
            key: key.to_string(),
        };

        let parts: Vec<&str> = key.split(':').collect();
        if parts.len() < 5 || parts[1] != VERSION {
            return Err(malformed());
        }

        match (parts[0], parts[2]) {
            (NS_LOL_API, "cooldown") => match parts.len() {
                5 => {
                    let routing = parts[3].parse::<RoutingVal>().map_err(|_| malformed())?;
                    let limit_type =
                        parts[4].parse::<LimitType>().map_err(|_| malformed())?;
                    if limit_type == LimitType::Method {
                        return Err(malformed());
                    }
                    Ok(StoreKey {
                        kind: KeyKind::Cooldown,
                        routing,
                        endpoint: None,
                        limit_type,
                        window_sec: None,
                    })
                }
                6 => {
                    let routing = parts[3].parse::<RoutingVal>().map_err(|_| malformed())?;
                    let limit_type =
                        parts[5].parse::<LimitType>().map_err(|_| malformed())?;
                    if limit_type != LimitType::Method {
                        return Err(malformed());
                    }
                    Ok(StoreKey {
                        kind: KeyKind::Cooldown,
                        routing,
                        endpoint: Some(parts[4].to_string()),
                        limit_type,
                        window_sec: None,
                    })
                }
                _ => Err(malformed()),
            },
            (NS_LOL_API, "live") | (NS_RIOT, "authoritative") => {
                if parts.len() != 8 || parts[6] != "window" {
                    return Err(malformed());
                }
                let routing = parts[3].parse::<RoutingVal>().map_err(|_| malformed())?;
                let limit_type = parts[5].parse::<LimitType>().map_err(|_| malformed())?;
                let window = parts[7].parse::<u64>().map_err(|_| malformed())?;
                Ok(StoreKey {
                    kind: if parts[0] == NS_LOL_API {
                        KeyKind::LiveCounter
                    } else {
                        KeyKind::AuthoritativeCounter
                    },
                    routing,
                    endpoint: Some(parts[4].to_string()),
                    limit_type,
                    window_sec: Some(window),
                })
            }
            (NS_RIOT, "policy") => {
                if parts.len() < 7 {
                    return Err(malformed());
                }
                let routing = parts[3].parse::<RoutingVal>().map_err(|_| malformed())?;
                let limit_type = parts[5].parse::<LimitType>().map_err(|_| malformed())?;
                match parts.len() {
                    7 if parts[6] == "windows" => Ok(StoreKey {
                        kind: KeyKind::PolicyWindows,
                        routing,
                        endpoint: Some(parts[4].to_string()),
                        limit_type,
                        window_sec: None,
                    }),
                    9 if parts[6] == "window" && parts[8] == "limit" => {
                        let window = parts[7].parse::<u64>().map_err(|_| malformed())?;
                        Ok(StoreKey {
                            kind: KeyKind::PolicyLimit,
                            routing,
                            endpoint: Some(parts[4].to_string()),
                            limit_type,
                            window_sec: Some(window),
                        })
                    }
                    _ => Err(malformed()),
                }
            }
            _ => Err(malformed()),
        }
    }
}
