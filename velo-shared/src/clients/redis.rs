use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await
    }

    /// Push a job payload onto the head of a queue list.
    pub async fn lpush(&self, queue: &str, payload: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.lpush(queue, payload).await
    }

    /// Blocking pop from the tail of a queue list.
    ///
    /// Returns None when `timeout_secs` elapses with nothing to consume,
    /// so callers can loop and stay responsive to shutdown.
    pub async fn brpop(
        &self,
        queue: &str,
        timeout_secs: usize,
    ) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(queue, timeout_secs as f64).await?;
        Ok(popped.map(|(_, payload)| payload))
    }

    pub async fn llen(&self, queue: &str) -> Result<u64, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.llen(queue).await
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}
