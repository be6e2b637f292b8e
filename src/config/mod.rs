use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub steady_distance_meters: f64,
    pub recent_fix_window_secs: u64,
    pub cache_ttl_secs: u64,
}

/// 行程判定策略参数，由配置派生，引擎只依赖这一份
#[derive(Debug, Clone, Copy)]
pub struct JourneyPolicy {
    /// 静止判定距离阈值（米）
    pub steady_distance_meters: f64,
    /// 近期定位滑动窗口
    pub recent_window: Duration,
}

impl JourneyPolicy {
    pub fn recent_window_millis(&self) -> i64 {
        self.recent_window.as_millis() as i64
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            steady_distance_meters: env::var("STEADY_DISTANCE_METERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100.0),
            recent_fix_window_secs: env::var("RECENT_FIX_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        })
    }

    pub fn recent_fix_window(&self) -> Duration {
        Duration::from_secs(self.recent_fix_window_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn journey_policy(&self) -> JourneyPolicy {
        JourneyPolicy {
            steady_distance_meters: self.steady_distance_meters,
            recent_window: self.recent_fix_window(),
        }
    }
}
