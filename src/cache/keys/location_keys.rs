/// 用户行程状态缓存键前缀
const JOURNEY_STATE_PREFIX: &str = "journey:state:";

/// 生成用户行程状态缓存键
pub fn journey_state_key(user_id: &str) -> String {
    format!("{}{}", JOURNEY_STATE_PREFIX, user_id)
}
