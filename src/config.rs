use std::env;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "serenity-dev-secret-change-me";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub app_env: String,
    pub jwt_secret: String,
    pub admin_registration_key: Option<String>,
    pub admin_init_key: Option<String>,
    pub admin_email: String,
    pub admin_password: Option<String>,
    pub cors_origins: Vec<String>,
    /// Trust the first `x-forwarded-for` hop as the client address.
    pub trust_proxy: bool,
    pub db_max_connections: u32,
    pub db_statement_timeout: Option<Duration>,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) => secret,
            None if app_env == "production" => {
                anyhow::bail!("JWT_SECRET must be set when APP_ENV=production")
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        let admin_registration_key = non_empty("ADMIN_REGISTRATION_KEY");
        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => default_origins(&app_env),
        };

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/serenity.db".to_string()),
            app_env,
            jwt_secret,
            admin_init_key: non_empty("ADMIN_INIT_KEY").or_else(|| admin_registration_key.clone()),
            admin_registration_key,
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@serenitymassage.org".to_string()),
            admin_password: non_empty("ADMIN_PASSWORD"),
            cors_origins,
            trust_proxy: env::var("TRUST_PROXY")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            db_statement_timeout: env::var("DB_STATEMENT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

fn default_origins(app_env: &str) -> Vec<String> {
    let origins: &[&str] = if app_env == "production" {
        &["https://serenitymassage.org", "https://classes.serenitymassage.org"]
    } else {
        &["http://localhost:3000", "http://localhost:3002"]
    };
    origins.iter().map(|o| o.to_string()).collect()
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
