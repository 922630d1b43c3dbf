//! Atomic check-and-increment script
//!
//! The admission decision must probe and commit N window counters as one
//! linearisable step; two callers racing across nodes must never both
//! observe sub-limit counts and both commit. The Lua script below is the
//! only place live counters are incremented.
//!
//! KEYS: `counter_1..counter_n, limit_1..limit_n`
//! ARGV: `n, window_1..window_n`
//!
//! Reply shapes:
//! - `{"throttle", offending_key, count, limit, ttl}`: first key (in input
//!   order) whose probe failed; nothing was incremented.
//! - `{"allow", count_1, ttl_1, .., count_n, ttl_n}`: every counter was
//!   incremented; fresh counters got their window as expiry.

use super::pool::RedisPool;
use crate::utils::error::{LimiterError, Result};
use redis::{Script, Value, from_redis_value};
use std::sync::OnceLock;

/// Phase 1 probes every pair read-only; phase 2 commits only if all probes
/// passed. A missing policy-limit key reads as limit 0 and always throttles:
/// an unbootstrapped policy must not silently admit.
const CHECK_AND_INCREMENT: &str = r#"
local n = tonumber(ARGV[1])
for i = 1, n do
  local raw_count = redis.call('GET', KEYS[i])
  local count = raw_count and tonumber(raw_count) or 0
  local raw_limit = redis.call('GET', KEYS[n + i])
  local limit = raw_limit and tonumber(raw_limit) or 0
  if count >= limit then
    local ttl = redis.call('TTL', KEYS[i])
    return {'throttle', KEYS[i], count, limit, ttl}
  end
end
local reply = {'allow'}
for i = 1, n do
  local count = redis.call('INCR', KEYS[i])
  if count == 1 then
    redis.call('EXPIRE', KEYS[i], tonumber(ARGV[1 + i]))
  end
  reply[2 * i] = count
  reply[2 * i + 1] = redis.call('TTL', KEYS[i])
end
return reply
"#;

/// Decoded script reply
#[derive(Debug, Clone, PartialEq)]
pub enum CheckAndIncrReply {
    /// All probes passed; `(count, ttl)` per counter in input order
    Allowed(Vec<(i64, i64)>),
    /// A probe failed; nothing was committed
    Throttled {
        /// The first counter key that breached its limit
        key: String,
        /// Count observed on that counter
        count: i64,
        /// Limit the counter breached
        limit: i64,
        /// Remaining TTL on the counter (-1 no expiry, -2 missing)
        ttl: i64,
    },
}

fn check_and_increment_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(CHECK_AND_INCREMENT))
}

impl RedisPool {
    /// Atomically probe and increment a set of window counters
    ///
    /// `counter_keys`, `limit_keys`, and `windows` are parallel slices, one
    /// element per `(limit_type, window)` pair.
    pub async fn check_and_increment(
        &self,
        counter_keys: &[String],
        limit_keys: &[String],
        windows: &[u64],
    ) -> Result<CheckAndIncrReply> {
        debug_assert_eq!(counter_keys.len(), limit_keys.len());
        debug_assert_eq!(counter_keys.len(), windows.len());

        let mut conn = self.get_connection().await?;
        let script = check_and_increment_script();
        let mut invocation = script.prepare_invoke();
        for key in counter_keys {
            invocation.key(key);
        }
        for key in limit_keys {
            invocation.key(key);
        }
        invocation.arg(counter_keys.len());
        for window in windows {
            invocation.arg(*window);
        }

        let value: Value = self.timed(invocation.invoke_async(&mut conn)).await?;
        parse_reply(&value)
    }
}

/// Interpret the raw script reply
fn parse_reply(value: &Value) -> Result<CheckAndIncrReply> {
    let malformed = |reason: &str| {
        LimiterError::InvariantViolated(format!("unexpected script reply: {reason}"))
    };

    let items: Vec<Value> = from_redis_value(value)
        .map_err(|_| malformed("not an array"))?;
    let status: String = items
        .first()
        .and_then(|v| from_redis_value(v).ok())
        .ok_or_else(|| malformed("missing status element"))?;

    match status.as_str() {
        "throttle" => {
            if items.len() != 5 {
                return Err(malformed("throttle reply must have 5 elements"));
            }
            let key: String =
                from_redis_value(&items[1]).map_err(|_| malformed("bad key"))?;
            let count: i64 =
                from_redis_value(&items[2]).map_err(|_| malformed("bad count"))?;
            let limit: i64 =
                from_redis_value(&items[3]).map_err(|_| malformed("bad limit"))?;
            let ttl: i64 =
                from_redis_value(&items[4]).map_err(|_| malformed("bad ttl"))?;
            Ok(CheckAndIncrReply::Throttled {
                key,
                count,
                limit,
                ttl,
            })
        }
        "allow" => {
            if items.len() % 2 != 1 {
                return Err(malformed("allow reply must pair counts with ttls"));
            }
            let mut counters = Vec::with_capacity((items.len() - 1) / 2);
            for pair in items[1..].chunks(2) {
                let count: i64 =
                    from_redis_value(&pair[0]).map_err(|_| malformed("bad count"))?;
                let ttl: i64 =
                    from_redis_value(&pair[1]).map_err(|_| malformed("bad ttl"))?;
                counters.push((count, ttl));
            }
            Ok(CheckAndIncrReply::Allowed(counters))
        }
        other => Err(malformed(&format!("unknown status `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    // ==================== Reply Parsing Tests ====================

    #[test]
    fn test_parse_throttle_reply() {
        let value = Value::Array(vec![
            bulk("throttle"),
            bulk("lol_api:v1:live:euw1:/lol/summoner:application:window:1"),
            Value::Int(2),
            Value::Int(2),
            Value::Int(1),
        ]);
        let reply = parse_reply(&value).unwrap();
        assert_eq!(
            reply,
            CheckAndIncrReply::Throttled {
                key: "lol_api:v1:live:euw1:/lol/summoner:application:window:1".to_string(),
                count: 2,
                limit: 2,
                ttl: 1,
            }
        );
    }

    #[test]
    fn test_parse_allow_reply() {
        let value = Value::Array(vec![
            bulk("allow"),
            Value::Int(1),
            Value::Int(120),
            Value::Int(1),
            Value::Int(1),
            Value::Int(1),
            Value::Int(10),
        ]);
        let reply = parse_reply(&value).unwrap();
        assert_eq!(
            reply,
            CheckAndIncrReply::Allowed(vec![(1, 120), (1, 1), (1, 10)])
        );
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let value = Value::Array(vec![bulk("maybe")]);
        assert!(parse_reply(&value).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_throttle() {
        let value = Value::Array(vec![bulk("throttle"), bulk("some-key")]);
        assert!(parse_reply(&value).is_err());
    }

    #[test]
    fn test_parse_rejects_unpaired_allow() {
        let value = Value::Array(vec![bulk("allow"), Value::Int(1)]);
        assert!(parse_reply(&value).is_err());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_reply(&Value::Int(7)).is_err());
    }

    #[test]
    fn test_parse_empty_allow_is_valid() {
        // Degenerate but well-formed: no counters to report
        let value = Value::Array(vec![bulk("allow")]);
        let reply = parse_reply(&value).unwrap();
        assert_eq!(reply, CheckAndIncrReply::Allowed(vec![]));
    }
}
