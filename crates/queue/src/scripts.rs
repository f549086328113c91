// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lua scripts backing the atomic substrate operations.
//!
//! Each script runs single-threaded inside Redis, which is what makes the
//! concurrency gate and delayed-job promotion safe across independently
//! deployed worker processes.

/// Promote due delayed jobs, honor the gate, pop one waiting job and mark
/// it active.
///
/// KEYS: waiting, delayed, active, gate
/// ARGV: now_ms, visibility_deadline_ms
///
/// Returns the popped job id, or false when the queue is empty or gated.
pub const LEASE: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[2], 0, ARGV[1], 'LIMIT', 0, 100)
for _, id in ipairs(due) do
  redis.call('RPUSH', KEYS[1], id)
  redis.call('ZREM', KEYS[2], id)
end
local gate = redis.call('GET', KEYS[4])
if gate then
  local active = redis.call('ZCARD', KEYS[3])
  if active >= tonumber(gate) then
    return false
  end
end
local id = redis.call('LPOP', KEYS[1])
if not id then
  return false
end
redis.call('ZADD', KEYS[3], ARGV[2], id)
return id
"#;

/// Remove a job from the active set; delete its record.
///
/// KEYS: active, job
/// ARGV: job_id
///
/// Returns 1 when the job was still active (first completion wins), 0 when
/// it had already been reclaimed or completed elsewhere.
pub const ACK: &str = r#"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('DEL', KEYS[2])
return removed
"#;

/// Re-queue a failed job with a delay, or drop it when attempts are spent.
///
/// KEYS: active, delayed, job
/// ARGV: job_id, retry (0/1), deliver_at_ms
///
/// Returns 1 when re-queued, 0 when dropped.
pub const NACK: &str = r#"
redis.call('ZREM', KEYS[1], ARGV[1])
if ARGV[2] == '1' then
  redis.call('ZADD', KEYS[2], ARGV[3], ARGV[1])
  return 1
end
redis.call('DEL', KEYS[3])
return 0
"#;

/// Move expired active jobs back to waiting, or mark them dead when their
/// attempts are spent (attempt counts are incremented at lease time, so a
/// job that stalled on its final attempt must not be re-delivered).
///
/// KEYS: active, waiting
/// ARGV: now_ms, job_key_prefix
///
/// Returns `{"stalled:<id>" | "dead:<id>", ...}`. Dead job records are left
/// in place for the caller to read correlation fields from before deleting.
pub const RECLAIM: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[1], 0, ARGV[1])
local out = {}
for _, id in ipairs(expired) do
  redis.call('ZREM', KEYS[1], id)
  local jobkey = ARGV[2] .. id
  local attempt = tonumber(redis.call('HGET', jobkey, 'attempt') or '0')
  local max = tonumber(redis.call('HGET', jobkey, 'max_attempts') or '1')
  if attempt >= max then
    table.insert(out, 'dead:' .. id)
  else
    redis.call('RPUSH', KEYS[2], id)
    table.insert(out, 'stalled:' .. id)
  end
end
return out
"#;

/// Sliding-window rate limit check.
///
/// KEYS: window
/// ARGV: now_ms, window_ms, limit, member
///
/// Returns 1 when the request is admitted, 0 when the window is full.
pub const RATELIMIT: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], 0, ARGV[1] - ARGV[2])
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[3]) then
  return 0
end
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[4])
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return 1
"#;
