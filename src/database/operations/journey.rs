// 行程存储库
// journeys 表上的读写，实现引擎的 JourneyStore 接口

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::journey::{Journey, JourneyKind};
use crate::engine::traits::JourneyStore;
use crate::error::EngineError;

const JOURNEY_COLUMNS: &str = "id, user_id, kind, from_latitude, from_longitude, \
     to_latitude, to_longitude, created_at, recorded_at, duration_millis, route_distance_meters";

/// 行程存储库，处理所有与行程相关的数据库操作
pub struct JourneyOperation {
    db: Arc<PgPool>,
}

impl JourneyOperation {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }

    async fn last_by_kind(
        &self,
        user_id: &str,
        kind: Option<JourneyKind>,
    ) -> Result<Option<Journey>, EngineError> {
        let journey = match kind {
            Some(kind) => {
                let query = format!(
                    "SELECT {JOURNEY_COLUMNS} FROM journeys \
                     WHERE user_id = $1 AND kind = $2 \
                     ORDER BY created_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, Journey>(&query)
                    .bind(user_id)
                    .bind(kind)
                    .fetch_optional(&*self.db)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {JOURNEY_COLUMNS} FROM journeys \
                     WHERE user_id = $1 \
                     ORDER BY created_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, Journey>(&query)
                    .bind(user_id)
                    .fetch_optional(&*self.db)
                    .await?
            }
        };
        Ok(journey)
    }
}

fn insert_query() -> String {
    format!(
        "INSERT INTO journeys ({JOURNEY_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    )
}

const UPDATE_QUERY: &str = "UPDATE journeys SET \
     to_latitude = $2, to_longitude = $3, recorded_at = $4, \
     duration_millis = $5, route_distance_meters = $6 \
     WHERE id = $1";

fn bind_insert<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    journey: &'q Journey,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&journey.id)
        .bind(&journey.user_id)
        .bind(journey.kind)
        .bind(journey.from_latitude)
        .bind(journey.from_longitude)
        .bind(journey.to_latitude)
        .bind(journey.to_longitude)
        .bind(journey.created_at)
        .bind(journey.recorded_at)
        .bind(journey.duration_millis)
        .bind(journey.route_distance_meters)
}

fn bind_update<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    journey: &'q Journey,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&journey.id)
        .bind(journey.to_latitude)
        .bind(journey.to_longitude)
        .bind(journey.recorded_at)
        .bind(journey.duration_millis)
        .bind(journey.route_distance_meters)
}

#[async_trait]
impl JourneyStore for JourneyOperation {
    async fn last_steady_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        self.last_by_kind(user_id, Some(JourneyKind::Steady)).await
    }

    async fn last_moving_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        self.last_by_kind(user_id, Some(JourneyKind::Moving)).await
    }

    async fn last_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        self.last_by_kind(user_id, None).await
    }

    async fn save_journey(&self, journey: &Journey) -> Result<(), EngineError> {
        let query = insert_query();
        bind_insert(sqlx::query(&query), journey)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    async fn update_journey(&self, journey: &Journey) -> Result<(), EngineError> {
        bind_update(sqlx::query(UPDATE_QUERY), journey)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    async fn transition(&self, closing: &Journey, opening: &Journey) -> Result<(), EngineError> {
        // 关闭旧行程与开启新行程必须一起提交
        let mut tx = self.db.begin().await?;
        bind_update(sqlx::query(UPDATE_QUERY), closing)
            .execute(&mut *tx)
            .await?;
        let query = insert_query();
        bind_insert(sqlx::query(&query), opening)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
