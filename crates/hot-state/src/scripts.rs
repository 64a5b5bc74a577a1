//! Lua bodies for every atomic hot-state operation named in §3/§4. Each
//! script is loaded once per connection and invoked by SHA (handled
//! transparently by `redis::Script`).

/// KEYS[1] = counters hash. ARGV[1] = total. ARGV[2] = ttl seconds.
/// "Set if unset" so re-delivery of the batch-ready notification is a no-op
/// (§4.2 step 4b).
pub const INIT_COUNTERS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  redis.call('HSET', KEYS[1], 'sent', 0, 'failed', 0, 'total', ARGV[1])
end
redis.call('EXPIRE', KEYS[1], ARGV[2])
return redis.call('HMGET', KEYS[1], 'sent', 'failed', 'total')
";

/// KEYS = {counters, recipients, pending_sync, pending_sync_index}.
/// ARGV = {recipient_id, success ('1'/'0'), recipient_record_json, batch_id,
/// ttl_seconds}. Increment and recipient write happen in the same script so
/// neither can be observed without the other (§4.3 step 6, §8 property 1).
pub const RECORD_OUTCOME: &str = r"
local field = ARGV[2] == '1' and 'sent' or 'failed'
redis.call('HINCRBY', KEYS[1], field, 1)
redis.call('HSET', KEYS[2], ARGV[1], ARGV[3])
redis.call('SADD', KEYS[3], ARGV[1])
redis.call('SADD', KEYS[4], ARGV[4])
redis.call('EXPIRE', KEYS[1], ARGV[5])
redis.call('EXPIRE', KEYS[2], ARGV[5])
redis.call('EXPIRE', KEYS[3], ARGV[5])
local sent = tonumber(redis.call('HGET', KEYS[1], 'sent'))
local failed = tonumber(redis.call('HGET', KEYS[1], 'failed'))
local total = tonumber(redis.call('HGET', KEYS[1], 'total'))
return {sent, failed, total}
";

/// Tightens a counters hash's TTL after completion (§3: 48h retention).
pub const SHRINK_TTL: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return redis.status_reply('OK')
";

/// KEYS[1] = rate-limit bucket for (sendConfigId, window). ARGV[1] = limit.
/// First caller in the window sets the 2s expiry so the key never survives
/// longer than needed for a 1s bucket window (§4.5).
pub const RATE_LIMIT_ACQUIRE: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], 2)
end
if count <= tonumber(ARGV[1]) then
  return {1, 0}
else
  return {0, 1000}
end
";

/// KEYS[1] = leader lock. ARGV = {worker_id, ttl_seconds}. Set-if-absent,
/// or refresh if we already hold it (§4.8).
pub const LEADER_ACQUIRE: &str = r"
local holder = redis.call('GET', KEYS[1])
if holder == false then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
  return 1
end
if holder == ARGV[1] then
  redis.call('EXPIRE', KEYS[1], ARGV[2])
  return 1
end
return 0
";

/// Compare-and-refresh heartbeat: only extends the TTL if we are still the
/// recorded holder (§4.8).
pub const LEADER_REFRESH: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('EXPIRE', KEYS[1], ARGV[2])
  return 1
end
return 0
";

pub const LEADER_RELEASE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return 1
end
return 0
";

/// KEYS[1] = dedup marker. ARGV[1] = ttl millis. Returns 1 if this call
/// created the marker (i.e. the event is new), 0 if it already existed.
pub const WEBHOOK_DEDUP_CHECK: &str = r"
local added = redis.call('SET', KEYS[1], '1', 'NX', 'PX', ARGV[1])
if added then return 1 else return 0 end
";
