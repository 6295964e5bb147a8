use reqwest::Url;

use crate::error::{AppError, Result};

use super::{Config, PollConfig, RetryConfig, UpstreamConfig};

/// Validate a configuration and surface every problem in one descriptive error.
pub fn validate(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_upstream(&config.upstream, &mut issues);
    validate_retry(&config.retry, &mut issues);
    validate_poll(&config.poll, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_upstream(upstream: &UpstreamConfig, issues: &mut Vec<String>) {
    for (label, value) in [
        ("upstream.base_url", &upstream.base_url),
        ("upstream.api_base", &upstream.api_base),
    ] {
        if let Err(err) = Url::parse(value) {
            issues.push(format!("{label} `{value}` is not a valid URL: {err}"));
        }
    }

    if upstream.session_expired_marker.trim().is_empty() {
        issues.push("upstream.session_expired_marker must not be empty".to_string());
    }
    if upstream.access_restricted_marker.trim().is_empty() {
        issues.push("upstream.access_restricted_marker must not be empty".to_string());
    }
    if upstream.session_expired_marker == upstream.access_restricted_marker {
        issues.push("session and access-restriction markers must differ".to_string());
    }
    if upstream.timeout_secs == 0 {
        issues.push("upstream.timeout_secs must be greater than zero".to_string());
    }
}

fn validate_retry(retry: &RetryConfig, issues: &mut Vec<String>) {
    if retry.max_retries == 0 {
        issues.push("retry.max_retries must be at least 1".to_string());
    }
    // The last backoff is 2^(max_retries-2) units; past 16 it runs to days.
    if retry.max_retries > 16 {
        issues.push(format!(
            "retry.max_retries {} exceeds the supported maximum of 16",
            retry.max_retries
        ));
    }
}

fn validate_poll(poll: &PollConfig, issues: &mut Vec<String>) {
    if poll.interval_secs == 0 {
        issues.push("poll.interval_secs must be greater than zero".to_string());
    }
    if poll.concurrency_limit == 0 {
        issues.push("poll.concurrency_limit must be at least 1".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        validate(&Config::builtin()).expect("built-in config should be valid");
    }

    #[test]
    fn aggregates_every_issue() {
        let mut config = Config::builtin();
        config.retry.max_retries = 0;
        config.poll.concurrency_limit = 0;
        config.upstream.api_base = "not a url".to_string();

        let err = validate(&config).expect_err("validation should fail");
        let message = err.to_string();
        assert!(message.contains("max_retries"), "unexpected error message: {message}");
        assert!(message.contains("concurrency_limit"), "unexpected error message: {message}");
        assert!(message.contains("api_base"), "unexpected error message: {message}");
    }

    #[test]
    fn caps_retry_budget() {
        let mut config = Config::builtin();
        config.retry.max_retries = 16;
        assert!(validate(&config).is_ok());

        config.retry.max_retries = 17;
        let message = validate(&config).unwrap_err().to_string();
        assert!(message.contains("supported maximum of 16"), "unexpected error message: {message}");
    }

    #[test]
    fn rejects_identical_markers() {
        let mut config = Config::builtin();
        config.upstream.access_restricted_marker = config.upstream.session_expired_marker.clone();

        let err = validate(&config).expect_err("validation should fail");
        assert!(
            err.to_string().contains("must differ"),
            "unexpected error message: {}",
            err
        );
    }
}
