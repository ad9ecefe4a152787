use redis::{AsyncCommands, aio::ConnectionManager};
use std::net::IpAddr;

/// Failed logins allowed per email and client IP inside one window
pub const MAX_LOGIN_ATTEMPTS: i64 = 10;
/// Lifetime of the failed-login counter, in seconds
pub const LOGIN_ATTEMPT_WINDOW_SECS: i64 = 60 * 60;

#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

fn refresh_key(user_id: &str) -> String {
    format!("refresh:{}", user_id)
}

fn login_attempts_key(ip: IpAddr, email: &str) -> String {
    format!("login_attempts:{}:{}", email.to_lowercase(), ip)
}

impl RedisClient {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn save_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
        expires_in_seconds: i64,
    ) -> redis::RedisResult<()> {
        // ConnectionManager clones share one multiplexed connection
        let mut conn = self.conn.clone();
        conn.set_ex(
            refresh_key(user_id),
            refresh_token,
            expires_in_seconds.max(1) as u64,
        )
        .await
    }

    pub async fn get_refresh_token(&self, user_id: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(refresh_key(user_id)).await
    }

    pub async fn delete_refresh_token(&self, user_id: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(refresh_key(user_id)).await
    }

    pub async fn get_login_attempts(
        &self,
        ip: IpAddr,
        email: &str,
    ) -> redis::RedisResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(login_attempts_key(ip, email)).await
    }

    /// Count one failed login; the window starts at the first failure
    pub async fn increment_login_attempts(&self, ip: IpAddr, email: &str) -> redis::RedisResult<()> {
        let key = login_attempts_key(ip, email);
        let mut conn = self.conn.clone();
        let attempts: i64 = conn.incr(&key, 1).await?;
        if attempts == 1 {
            let _: () = conn.expire(&key, LOGIN_ATTEMPT_WINDOW_SECS).await?;
        }
        Ok(())
    }

    pub async fn clear_login_attempts(&self, ip: IpAddr, email: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(login_attempts_key(ip, email)).await
    }
}
