//! Environment-overridable integer configuration (spec §6): no config
//! file, no CLI — "no other configuration in the core."

use std::env;

const DEFAULT_MAX_FRAME_SIZE: u32 = 131_072;
const DEFAULT_IDLE_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub max_frame_size: u32,
    pub idle_timeout_ms: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            max_frame_size: read_env_u32("AmqpMaxFrameSize", DEFAULT_MAX_FRAME_SIZE),
            idle_timeout_ms: read_env_u32("AmqpIdleTimeout", DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(name, value = %raw, "invalid configuration value, falling back to default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_format_section() {
        let cfg = Config::default();
        assert_eq!(cfg.max_frame_size, 131_072);
        assert_eq!(cfg.idle_timeout_ms, 10_000);
    }
}
