use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session token lifetime. Defaults to 7 days.
    pub jwt_expiry_seconds: u64,
    pub host: String,
    pub port: u16,
    /// Admin console credential, separate from the users table.
    pub admin_username: String,
    pub admin_password: String,
    pub ai_api_key: Option<String>,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub ai_timeout_seconds: u64,
    pub prompts_file: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "604800".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: required("ADMIN_PASSWORD")?,
            ai_api_key: env::var("AI_API_KEY").ok().filter(|s| !s.is_empty()),
            ai_endpoint: env::var("AI_ENDPOINT").unwrap_or_else(|_| {
                "https://ark.cn-beijing.volces.com/api/v3/chat/completions".into()
            }),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "doubao-seed-1-8-251228".into()),
            ai_timeout_seconds: env::var("AI_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            prompts_file: env::var("PROMPTS_FILE").unwrap_or_else(|_| "./ai-prompts.json".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
