//! Upstream response header parsing
//!
//! The Riot API publishes its quota policy in response headers rather than
//! up front. This module turns those headers into [`LimitEntry`] values:
//! [`parse`] extracts the per-window limit/count declarations and
//! [`extract_cooldown`] builds the back-off observation for a 429.
//!
//! Header value grammar: `LIMIT ":" WINDOW ("," LIMIT ":" WINDOW)*`, all
//! integers, windows in seconds. `date` is RFC 1123.

use crate::limits::entry::{EntrySource, LimitEntry, LimitType};
use crate::limits::routing::RoutingVal;
use crate::utils::error::{LimiterError, Result};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use tracing::warn;

/// Upstream wall-clock at response time
pub const H_DATE: &str = "date";
/// Back-off seconds attached to a 429
pub const H_RETRY_AFTER: &str = "retry-after";
/// Scope identifier attached to a 429
pub const H_RATE_LIMIT_TYPE: &str = "x-rate-limit-type";
/// App-scope `count_limit:window` declarations
pub const H_APP_LIMIT: &str = "x-app-rate-limit";
/// App-scope current counts per window
pub const H_APP_COUNT: &str = "x-app-rate-limit-count";
/// Method-scope `count_limit:window` declarations
pub const H_METHOD_LIMIT: &str = "x-method-rate-limit";
/// Method-scope current counts per window
pub const H_METHOD_COUNT: &str = "x-method-rate-limit-count";

/// Extract one entry per `(limit_type, window)` declared in the headers
///
/// A scope whose `*-rate-limit` header is absent is omitted. A window that
/// appears in the limit header but not the count header gets count 0. When
/// neither scope declares anything the caller receives
/// [`LimiterError::RateLimitHeadersAbsent`] and decides how to proceed.
pub fn parse(
    headers: &HeaderMap,
    routing: RoutingVal,
    endpoint: &str,
) -> Result<Vec<LimitEntry>> {
    let request_time = parse_date(headers)?;

    let app = scope_entries(
        headers,
        routing,
        endpoint,
        LimitType::Application,
        H_APP_LIMIT,
        H_APP_COUNT,
        request_time,
    )?;
    let method = scope_entries(
        headers,
        routing,
        endpoint,
        LimitType::Method,
        H_METHOD_LIMIT,
        H_METHOD_COUNT,
        request_time,
    )?;

    if app.is_empty() && method.is_empty() {
        return Err(LimiterError::RateLimitHeadersAbsent {
            routing,
            endpoint: endpoint.to_string(),
        });
    }

    let mut entries = app;
    entries.extend(method);
    Ok(entries)
}

/// Build the cooldown observation for a throttled response
///
/// Defaults for absent headers: `x-rate-limit-type` falls back to `service`,
/// `date` to `now`, and `retry-after` to `max_ttl`.
pub fn extract_cooldown(
    headers: &HeaderMap,
    routing: RoutingVal,
    endpoint: &str,
    now: DateTime<Utc>,
    max_ttl: u64,
) -> Result<LimitEntry> {
    let limit_type = match header_str(headers, H_RATE_LIMIT_TYPE)? {
        Some(raw) => raw.parse::<LimitType>().map_err(|_| {
            LimiterError::HeaderMalformed {
                header: H_RATE_LIMIT_TYPE.to_string(),
                reason: format!("unknown limit type `{raw}`"),
            }
        })?,
        None => LimitType::Service,
    };
    let request_time = parse_date(headers)?.unwrap_or(now);
    let retry_after = match header_str(headers, H_RETRY_AFTER)? {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            LimiterError::HeaderMalformed {
                header: H_RETRY_AFTER.to_string(),
                reason: format!("expected integer seconds, got `{raw}`"),
            }
        })?,
        None => max_ttl,
    };

    LimitEntry::builder(routing, EntrySource::Headers)
        .endpoint(endpoint)
        .limit_type(limit_type)
        .request_time(request_time)
        .retry_after(retry_after)
        .build()
}

/// True when the response carries everything a cooldown write needs
pub fn has_cooldown_directive(headers: &HeaderMap) -> bool {
    headers.contains_key(H_RETRY_AFTER)
        && headers.contains_key(H_RATE_LIMIT_TYPE)
        && headers.contains_key(H_DATE)
}

fn scope_entries(
    headers: &HeaderMap,
    routing: RoutingVal,
    endpoint: &str,
    limit_type: LimitType,
    limit_header: &str,
    count_header: &str,
    request_time: Option<DateTime<Utc>>,
) -> Result<Vec<LimitEntry>> {
    let limits = match header_str(headers, limit_header)? {
        Some(raw) => parse_window_pairs(limit_header, raw)?,
        None => {
            if headers.contains_key(count_header) {
                warn!(
                    header = count_header,
                    "count header present without its limit header, scope ignored"
                );
            }
            return Ok(Vec::new());
        }
    };
    let counts = match header_str(headers, count_header)? {
        Some(raw) => parse_window_pairs(count_header, raw)?,
        None => {
            warn!(
                header = limit_header,
                "limit header present without counts, assuming zero usage"
            );
            Vec::new()
        }
    };

    let mut entries = Vec::with_capacity(limits.len());
    for (limit, window) in &limits {
        let count = counts
            .iter()
            .find(|(_, w)| w == window)
            .map(|(c, _)| *c)
            .unwrap_or(0);
        let mut builder = LimitEntry::builder(routing, EntrySource::Headers)
            .endpoint(endpoint)
            .limit_type(limit_type)
            .window_sec(*window)
            .count_limit(*limit)
            .count(count);
        if let Some(time) = request_time {
            builder = builder.request_time(time);
        }
        entries.push(builder.build()?);
    }

    for (_, window) in &counts {
        if !limits.iter().any(|(_, w)| w == window) {
            warn!(
                header = count_header,
                window = *window,
                "count window not declared in limit header, ignored"
            );
        }
    }

    Ok(entries)
}

/// Parse `N:W,N:W` into `(value, window)` pairs, preserving header order
fn parse_window_pairs(header: &str, raw: &str) -> Result<Vec<(u64, u64)>> {
    let malformed = |reason: String| LimiterError::HeaderMalformed {
        header: header.to_string(),
        reason,
    };

    raw.split(',')
        .map(|pair| {
            let (value, window) = pair
                .trim()
                .split_once(':')
                .ok_or_else(|| malformed(format!("expected `count:window`, got `{pair}`")))?;
            let value = value
                .parse::<u64>()
                .map_err(|_| malformed(format!("non-integer count `{value}`")))?;
            let window = window
                .parse::<u64>()
                .map_err(|_| malformed(format!("non-integer window `{window}`")))?;
            if window == 0 {
                return Err(malformed("zero-length window".to_string()));
            }
            Ok((value, window))
        })
        .collect()
}

fn parse_date(headers: &HeaderMap) -> Result<Option<DateTime<Utc>>> {
    match header_str(headers, H_DATE)? {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc2822(raw).map_err(|e| {
                LimiterError::HeaderMalformed {
                    header: H_DATE.to_string(),
                    reason: format!("not an RFC 1123 date: {e}"),
                }
            })?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| LimiterError::HeaderMalformed {
                header: name.to_string(),
                reason: "value is not valid ASCII".to_string(),
            }),
        None => Ok(None),
    }
}
