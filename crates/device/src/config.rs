use std::env;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.1.183".to_string(),
            timeout_secs: 5,
        }
    }
}

impl DeviceConfig {
    pub fn from_env() -> Self {
        let mut cfg = DeviceConfig::default();

        if let Ok(v) = env::var("PICO_URL") {
            if !v.is_empty() {
                cfg.base_url = v;
            }
        }
        if let Ok(v) = env::var("PICO_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.timeout_secs = s;
            }
        }

        cfg
    }
}
