// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed queue implementation.
//!
//! Layout (all under the `trellis:` prefix):
//! - `q:{name}:wait` — list of runnable job IDs
//! - `q:{name}:delayed` — zset, score = retry due time
//! - `q:{name}:active` — zset, score = lease deadline
//! - `job:{id}` — hash: `data` (envelope JSON) plus the mutable fields
//!   (`state`, `attempts`, `pending`, `parent`, `queue`, `error`)
//! - `completed` — list of recent completions, trimmed to the keep limit
//! - `counter:{key}`, `flag:{key}` — cache primitives
//!
//! Every multi-step transition is a Lua script, so concurrent workers and
//! producers never observe half a transition.

use crate::backend::Backend;
use crate::error::QueueError;
use crate::job::QueuedJob;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;
use tokio::time::Instant;
use trellis_core::{JobId, JobState, QueueName};

const PREFIX: &str = "trellis";

/// Promote due delayed jobs, then lease the head of the waiting list.
const RESERVE: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[1])
for _, id in ipairs(due) do
    redis.call('ZREM', KEYS[2], id)
    redis.call('LPUSH', KEYS[1], id)
    redis.call('HSET', ARGV[3]..id, 'state', 'waiting')
end
local id = redis.call('RPOP', KEYS[1])
if not id then
    return false
end
redis.call('ZADD', KEYS[3], tonumber(ARGV[1]) + tonumber(ARGV[2]), id)
local jk = ARGV[3]..id
redis.call('HSET', jk, 'state', 'active')
local attempts = redis.call('HINCRBY', jk, 'attempts', 1)
local data = redis.call('HGET', jk, 'data')
return {id, data, attempts}
"#;

/// Ack a job, release its parent when the last sibling finishes, and trim
/// the completed log.
const COMPLETE: &str = r#"
local jk = ARGV[2]..ARGV[1]
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('HSET', jk, 'state', 'completed')
local parent = redis.call('HGET', jk, 'parent')
if parent and parent ~= '' then
    local pk = ARGV[2]..parent
    local pending = redis.call('HINCRBY', pk, 'pending', -1)
    if pending <= 0 and redis.call('HGET', pk, 'state') == 'waiting-children' then
        redis.call('HSET', pk, 'state', 'waiting')
        local pqueue = redis.call('HGET', pk, 'queue')
        redis.call('LPUSH', ARGV[4]..pqueue..':wait', parent)
    end
end
redis.call('LPUSH', KEYS[2], ARGV[1])
local excess = redis.call('LLEN', KEYS[2]) - tonumber(ARGV[3])
while excess > 0 do
    local old = redis.call('RPOP', KEYS[2])
    if old then
        redis.call('DEL', ARGV[2]..old)
    end
    excess = excess - 1
end
return 1
"#;

const RETRY: &str = r#"
local jk = ARGV[4]..ARGV[1]
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('HSET', jk, 'state', 'delayed', 'error', ARGV[3])
redis.call('ZADD', KEYS[2], tonumber(ARGV[2]), ARGV[1])
return 1
"#;

const FAIL: &str = r#"
local jk = ARGV[2]..ARGV[1]
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('HSET', jk, 'state', 'failed', 'error', ARGV[3])
local parent = redis.call('HGET', jk, 'parent')
if parent and parent ~= '' then
    local pk = ARGV[2]..parent
    local pending = redis.call('HINCRBY', pk, 'pending', -1)
    if pending <= 0 and redis.call('HGET', pk, 'state') == 'waiting-children' then
        redis.call('HSET', pk, 'state', 'waiting')
        local pqueue = redis.call('HGET', pk, 'queue')
        redis.call('LPUSH', ARGV[4]..pqueue..':wait', parent)
    end
end
return 1
"#;

/// Return expired leases to the waiting list.
const RECLAIM: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
for _, id in ipairs(expired) do
    redis.call('ZREM', KEYS[1], id)
    redis.call('LPUSH', KEYS[2], id)
    redis.call('HSET', ARGV[2]..id, 'state', 'waiting')
end
return #expired
"#;

/// Remove one not-yet-started job.
const REMOVE_WAITING: &str = r#"
local jk = ARGV[2]..ARGV[1]
local state = redis.call('HGET', jk, 'state')
if state == 'waiting' or state == 'waiting-children' or state == 'delayed' then
    redis.call('LREM', KEYS[1], 0, ARGV[1])
    redis.call('ZREM', KEYS[2], ARGV[1])
    redis.call('DEL', jk)
    return 1
end
return 0
"#;

fn wait_key(queue: QueueName) -> String {
    format!("{PREFIX}:q:{}:wait", queue.as_str())
}

fn delayed_key(queue: QueueName) -> String {
    format!("{PREFIX}:q:{}:delayed", queue.as_str())
}

fn active_key(queue: QueueName) -> String {
    format!("{PREFIX}:q:{}:active", queue.as_str())
}

fn job_prefix() -> String {
    format!("{PREFIX}:job:")
}

fn state_tag(state: JobState) -> &'static str {
    match state {
        JobState::Waiting => "waiting",
        JobState::WaitingChildren => "waiting-children",
        JobState::Active => "active",
        JobState::Delayed => "delayed",
        JobState::Completed => "completed",
        JobState::Failed => "failed",
    }
}

/// See module docs.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect with capped exponential backoff (1 s doubling to 30 s),
    /// retrying until `deadline` elapses. The pipeline stalls rather than
    /// loses work, so the retry itself is unbounded — only the caller's
    /// window bounds it.
    pub async fn connect(url: &str, deadline: Duration) -> Result<Self, QueueError> {
        let started = Instant::now();
        let mut delay = Duration::from_secs(1);
        loop {
            match Self::try_connect(url).await {
                Ok(conn) => return Ok(Self { conn }),
                Err(e) => {
                    if started.elapsed() >= deadline {
                        return Err(QueueError::Unavailable {
                            waited_ms: started.elapsed().as_millis() as u64,
                            message: e.to_string(),
                        });
                    }
                    tracing::warn!(error = %e, retry_in = ?delay, "queue backend connect failed");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(30));
                }
            }
        }
    }

    async fn try_connect(url: &str) -> Result<ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(url)?;
        ConnectionManager::new(client).await
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(job)?;
        let job_key = format!("{}{}", job_prefix(), job.id);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(&job_key, "data", data)
            .hset(&job_key, "state", state_tag(job.state))
            .hset(&job_key, "attempts", job.attempts_made)
            .hset(&job_key, "pending", job.pending_children)
            .hset(&job_key, "parent", job.parent.map(|p| p.to_string()).unwrap_or_default())
            .hset(&job_key, "queue", job.queue.as_str());
        if job.state == JobState::Waiting {
            pipe.lpush(wait_key(job.queue), job.id.as_str());
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn reserve(
        &self,
        queue: QueueName,
        lock_ms: u64,
    ) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String, u32)> = Script::new(RESERVE)
            .key(wait_key(queue))
            .key(delayed_key(queue))
            .key(active_key(queue))
            .arg(Self::now_ms())
            .arg(lock_ms)
            .arg(job_prefix())
            .invoke_async(&mut conn)
            .await?;

        let Some((_, data, attempts)) = result else {
            return Ok(None);
        };
        let mut job: QueuedJob = serde_json::from_str(&data)?;
        job.state = JobState::Active;
        job.attempts_made = attempts;
        Ok(Some(job))
    }

    async fn complete(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let job = self
            .job(job_id)
            .await?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        Script::new(COMPLETE)
            .key(active_key(job.queue))
            .key(format!("{PREFIX}:completed"))
            .arg(job_id.as_str())
            .arg(job_prefix())
            .arg(job.opts.keep_completed)
            .arg(format!("{PREFIX}:q:"))
            .invoke_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn retry(&self, job_id: JobId, error: &str, delay_ms: u64) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let job = self
            .job(job_id)
            .await?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        Script::new(RETRY)
            .key(active_key(job.queue))
            .key(delayed_key(job.queue))
            .arg(job_id.as_str())
            .arg(Self::now_ms() + delay_ms)
            .arg(error)
            .arg(job_prefix())
            .invoke_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn fail(&self, job_id: JobId, error: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let job = self
            .job(job_id)
            .await?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        Script::new(FAIL)
            .key(active_key(job.queue))
            .arg(job_id.as_str())
            .arg(job_prefix())
            .arg(error)
            .arg(format!("{PREFIX}:q:"))
            .invoke_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn reclaim_stalled(&self, queue: QueueName) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let reclaimed: u64 = Script::new(RECLAIM)
            .key(active_key(queue))
            .key(wait_key(queue))
            .arg(Self::now_ms())
            .arg(job_prefix())
            .invoke_async(&mut conn)
            .await?;
        if reclaimed > 0 {
            tracing::warn!(queue = %queue, reclaimed, "re-queued stalled jobs");
        }
        Ok(reclaimed)
    }

    async fn remove_waiting(&self, job_ids: &[JobId]) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        for id in job_ids {
            let Some(job) = self.job(*id).await? else { continue };
            Script::new(REMOVE_WAITING)
                .key(wait_key(job.queue))
                .key(delayed_key(job.queue))
                .arg(id.as_str())
                .arg(job_prefix())
                .invoke_async::<i64>(&mut conn)
                .await?;
        }
        Ok(())
    }

    async fn job(&self, job_id: JobId) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.conn.clone();
        let job_key = format!("{}{}", job_prefix(), job_id);
        let fields: Option<(String, String, u32, u32)> = redis::cmd("HMGET")
            .arg(&job_key)
            .arg("data")
            .arg("state")
            .arg("attempts")
            .arg("pending")
            .query_async(&mut conn)
            .await
            .ok()
            .flatten();
        let Some((data, state, attempts, pending)) = fields else {
            return Ok(None);
        };
        let mut job: QueuedJob = serde_json::from_str(&data)?;
        job.attempts_made = attempts;
        job.pending_children = pending;
        job.state = match state.as_str() {
            "waiting" => JobState::Waiting,
            "waiting-children" => JobState::WaitingChildren,
            "active" => JobState::Active,
            "delayed" => JobState::Delayed,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            other => return Err(QueueError::Backend(format!("bad job state: {other}"))),
        };
        Ok(Some(job))
    }

    async fn depth(&self, queue: QueueName) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.llen(wait_key(queue)).await?;
        let delayed: u64 = conn.zcard(delayed_key(queue)).await?;
        Ok(waiting + delayed)
    }

    async fn in_flight(&self, queue: QueueName) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard(active_key(queue)).await?)
    }

    async fn set_counter(&self, key: &str, value: i64) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(format!("{PREFIX}:counter:{key}"), value).await?;
        Ok(())
    }

    async fn decrement_counter(&self, key: &str) -> Result<i64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.decr(format!("{PREFIX}:counter:{key}"), 1).await?)
    }

    async fn set_flag_nx(&self, key: &str) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        let won: Option<String> = redis::cmd("SET")
            .arg(format!("{PREFIX}:flag:{key}"))
            .arg("1")
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(won.is_some())
    }

    async fn close(&self) -> Result<(), QueueError> {
        // ConnectionManager closes with its last clone.
        Ok(())
    }
}
