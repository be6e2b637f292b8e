use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::location_keys;
use crate::cache::models::location::CachedJourneyState;
use crate::engine::traits::StateCache;
use crate::error::EngineError;

/// 用户行程状态缓存操作
///
/// 状态以 JSON 存入 Redis 并带 TTL；缓存可随时从存储重建，
/// 过期或丢失只带来一次读放大。
pub struct LocationCacheOperations {
    redis: Arc<RedisClient>,
    ttl: Duration,
}

impl LocationCacheOperations {
    pub fn new(redis: Arc<RedisClient>, ttl: Duration) -> Self {
        Self { redis, ttl }
    }
}

#[async_trait]
impl StateCache for LocationCacheOperations {
    /// 从 Redis 获取用户行程状态
    async fn state(&self, user_id: &str) -> Result<Option<CachedJourneyState>, EngineError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let key = location_keys::journey_state_key(user_id);
        let result: Option<String> = conn.get(key).await?;

        match result {
            Some(json) => {
                let state = serde_json::from_str(&json)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// 将用户行程状态写入 Redis
    async fn put_state(
        &self,
        user_id: &str,
        state: &CachedJourneyState,
    ) -> Result<(), EngineError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let key = location_keys::journey_state_key(user_id);
        let json = serde_json::to_string(state)?;

        let _: () = conn.set_ex(key, json, self.ttl.as_secs()).await?;

        Ok(())
    }

    /// 从缓存中删除用户行程状态
    async fn invalidate(&self, user_id: &str) -> Result<(), EngineError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let key = location_keys::journey_state_key(user_id);
        let _: () = conn.del(key).await?;

        Ok(())
    }
}
