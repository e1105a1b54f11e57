use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::storage::Storage;
use crate::services::login_throttle::LoginThrottle;

pub struct AppState {
    pub db: Arc<dyn Storage>,
    pub config: AppConfig,
    pub login_throttle: Arc<dyn LoginThrottle>,
}
