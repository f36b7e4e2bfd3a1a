use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProviderConfig,
    pub workers: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub groq_api_key: String,
    pub groq_model: String,
    pub tavily_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub count: usize,
    pub queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
            },
            providers: ProviderConfig {
                groq_api_key: env::var("GROQ_API_KEY")?,
                groq_model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
                tavily_api_key: env::var("TAVILY_API_KEY")?,
            },
            workers: WorkerConfig {
                count: env::var("WORKER_COUNT")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
                queue_capacity: env::var("QUEUE_CAPACITY")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()?,
            },
        })
    }
}
