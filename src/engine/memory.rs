// 内存版协作方，仅测试使用，行为与 Postgres / Redis 适配器一致

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::cache::models::location::CachedJourneyState;
use crate::database::models::journey::{Journey, JourneyKind};
use crate::database::models::location::Fix;
use crate::error::EngineError;
use crate::geo::MotionState;

use super::traits::{JourneyStore, LocationHistory, StateCache};

#[derive(Default)]
pub struct MemoryStore {
    journeys: Mutex<Vec<Journey>>,
    pub fail_next_write: AtomicBool,
}

impl MemoryStore {
    pub fn all(&self) -> Vec<Journey> {
        self.journeys.lock().unwrap().clone()
    }

    fn last_matching(&self, user_id: &str, kind: Option<JourneyKind>) -> Option<Journey> {
        self.journeys
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.user_id == user_id && kind.is_none_or(|k| j.kind == k))
            .max_by_key(|j| j.created_at)
            .cloned()
    }

    fn check_failure(&self) -> Result<(), EngineError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl JourneyStore for MemoryStore {
    async fn last_steady_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        Ok(self.last_matching(user_id, Some(JourneyKind::Steady)))
    }

    async fn last_moving_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        Ok(self.last_matching(user_id, Some(JourneyKind::Moving)))
    }

    async fn last_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError> {
        Ok(self.last_matching(user_id, None))
    }

    async fn save_journey(&self, journey: &Journey) -> Result<(), EngineError> {
        self.check_failure()?;
        self.journeys.lock().unwrap().push(journey.clone());
        Ok(())
    }

    async fn update_journey(&self, journey: &Journey) -> Result<(), EngineError> {
        self.check_failure()?;
        let mut journeys = self.journeys.lock().unwrap();
        if let Some(existing) = journeys.iter_mut().find(|j| j.id == journey.id) {
            *existing = journey.clone();
        }
        Ok(())
    }

    async fn transition(&self, closing: &Journey, opening: &Journey) -> Result<(), EngineError> {
        self.check_failure()?;
        let mut journeys = self.journeys.lock().unwrap();
        if let Some(existing) = journeys.iter_mut().find(|j| j.id == closing.id) {
            *existing = closing.clone();
        }
        journeys.push(opening.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    current: Mutex<HashMap<String, Fix>>,
}

#[async_trait]
impl LocationHistory for MemoryHistory {
    async fn last_five_minute_fixes(&self, _user_id: &str) -> Result<Vec<Fix>, EngineError> {
        Ok(Vec::new())
    }

    async fn current_location(&self, user_id: &str) -> Result<Option<Fix>, EngineError> {
        Ok(self.current.lock().unwrap().get(user_id).cloned())
    }

    async fn save_current_location(
        &self,
        fix: &Fix,
        _state: MotionState,
    ) -> Result<(), EngineError> {
        self.current
            .lock()
            .unwrap()
            .insert(fix.user_id.clone(), fix.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    states: Mutex<HashMap<String, CachedJourneyState>>,
}

#[async_trait]
impl StateCache for MemoryCache {
    async fn state(&self, user_id: &str) -> Result<Option<CachedJourneyState>, EngineError> {
        Ok(self.states.lock().unwrap().get(user_id).cloned())
    }

    async fn put_state(
        &self,
        user_id: &str,
        state: &CachedJourneyState,
    ) -> Result<(), EngineError> {
        self.states
            .lock()
            .unwrap()
            .insert(user_id.to_string(), state.clone());
        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> Result<(), EngineError> {
        self.states.lock().unwrap().remove(user_id);
        Ok(())
    }
}
