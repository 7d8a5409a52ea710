use super::{types::Config, ConfigError, NotifierConfig};
use crate::retry::OperationClass;

/// Fetch policies never go below this many attempts.
const MIN_FETCH_ATTEMPTS: u32 = 3;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pool size is at least 1
/// - At least one platform, each with token, account and page
/// - A landing page prefix is set
/// - Retry attempt budgets
/// - Notifier credentials when a notifier is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.scheduler.pool_size == 0 {
        return Err(invalid("scheduler.pool_size must be at least 1"));
    }

    if config.platforms.is_empty() {
        return Err(invalid("at least one [platforms.\"<name>\"] entry is required"));
    }
    for (key, platform) in &config.platforms {
        let required = [
            ("access_token", &platform.access_token),
            ("ad_account_id", &platform.ad_account_id),
            ("page_id", &platform.page_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(format!("platforms.\"{}\".{} cannot be empty", key, field)));
            }
        }
    }

    if config.defaults.landing_page_prefix.trim().is_empty() {
        return Err(invalid("defaults.landing_page_prefix cannot be empty"));
    }

    for class in OperationClass::ALL {
        let attempts = config.retry.get(class).max_attempts;
        if attempts == 0 {
            return Err(invalid(format!("retry.{}.max_attempts must be at least 1", class)));
        }
        if class.is_fetch() && attempts < MIN_FETCH_ATTEMPTS {
            return Err(invalid(format!(
                "retry.{}.max_attempts must be at least {}",
                class, MIN_FETCH_ATTEMPTS
            )));
        }
    }

    if let Some(NotifierConfig::Twilio(twilio)) = &config.notifier {
        twilio
            .validate()
            .map_err(|e| invalid(format!("notifier: {}", e)))?;
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    const VALID: &str = r#"
[defaults]
landing_page_prefix = "https://land.test/?q="

[platforms."fb api"]
access_token = "t"
ad_account_id = "1"
page_id = "2"
"#;

    fn config(extra: &str) -> Config {
        load_config_from_str(&format!("{}\n{}", extra, VALID)).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config("")).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let result = validate_config(&config("[server]\nport = 0"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_pool_size() {
        let result = validate_config(&config("[scheduler]\npool_size = 0"));
        assert!(matches!(result, Err(ConfigError::ValidationError(m)) if m.contains("pool_size")));
    }

    #[test]
    fn test_validate_requires_platform() {
        let config = load_config_from_str(
            "[defaults]\nlanding_page_prefix = \"https://land.test/\"\n",
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_platform_field() {
        let mut config = config("");
        if let Some(platform) = config.platforms.get_mut("fb api") {
            platform.page_id = " ".to_string();
        }
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(m)) if m.contains("page_id")));
    }

    #[test]
    fn test_validate_landing_prefix() {
        let mut config = config("");
        config.defaults.landing_page_prefix.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_fetch_attempt_floor() {
        let result = validate_config(&config("[retry.fetch_image]\nmax_attempts = 2"));
        assert!(matches!(result, Err(ConfigError::ValidationError(m)) if m.contains("fetch_image")));

        let result = validate_config(&config("[retry.create_ad]\nmax_attempts = 0"));
        assert!(result.is_err());
        assert!(validate_config(&config("[retry.create_ad]\nmax_attempts = 1")).is_ok());
    }

    #[test]
    fn test_validate_notifier_fields() {
        let twilio = r#"
[notifier]
kind = "twilio"
account_sid = "AC1"
auth_token = ""
from_number = "+1"
to_number = "+2"
"#;
        assert!(validate_config(&config(twilio)).is_err());
        assert!(validate_config(&config("[notifier]\nkind = \"log\"")).is_ok());
    }
}
