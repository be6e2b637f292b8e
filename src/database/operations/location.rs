// 定位历史存储库
// user_locations 表上的读写，实现引擎的 LocationHistory 接口

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::database::models::location::Fix;
use crate::engine::traits::LocationHistory;
use crate::error::EngineError;
use crate::geo::MotionState;

/// 定位历史存储库
pub struct LocationOperation {
    db: Arc<PgPool>,
    window: Duration,
}

impl LocationOperation {
    pub fn new(db: Arc<PgPool>, window: Duration) -> Self {
        Self { db, window }
    }
}

#[async_trait]
impl LocationHistory for LocationOperation {
    async fn last_five_minute_fixes(&self, user_id: &str) -> Result<Vec<Fix>, EngineError> {
        let since = Utc::now().timestamp_millis() - self.window.as_millis() as i64;
        let fixes = sqlx::query_as::<_, Fix>(
            "SELECT user_id, latitude, longitude, recorded_at AS timestamp_millis \
             FROM user_locations \
             WHERE user_id = $1 AND recorded_at > $2 \
             ORDER BY recorded_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&*self.db)
        .await?;
        Ok(fixes)
    }

    async fn current_location(&self, user_id: &str) -> Result<Option<Fix>, EngineError> {
        let fix = sqlx::query_as::<_, Fix>(
            "SELECT user_id, latitude, longitude, recorded_at AS timestamp_millis \
             FROM user_locations \
             WHERE user_id = $1 \
             ORDER BY recorded_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(fix)
    }

    async fn save_current_location(
        &self,
        fix: &Fix,
        state: MotionState,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO user_locations (user_id, latitude, longitude, recorded_at, motion_state) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&fix.user_id)
        .bind(fix.latitude)
        .bind(fix.longitude)
        .bind(fix.timestamp_millis)
        .bind(state.value())
        .execute(&*self.db)
        .await?;
        Ok(())
    }
}
