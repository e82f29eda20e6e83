use super::*;

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://api.octopus.energy/v1/graphql/".to_string(),
            rest_url: "https://api.octopus.energy/v1/".to_string(),
            request_timeout_secs: 10,
            page_size: 1500,
            max_pages: 10,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            backoff_multiplier: 2.0,
            max_delay_ms: 5000,
            total_budget_ms: 30_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            capacity: 256,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/London".to_string(),
            currency_symbol: "£".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "json".to_string(),
            path: "/data/octowatt_users.json".to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/octowatt.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            billing: BillingConfig::default(),
            store: StoreConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
