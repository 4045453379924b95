#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = LockOptions::default();
        assert_eq!(options.ttl(), Duration::from_millis(30_000));
        assert_eq!(options.wait_timeout(), Duration::from_millis(5_000));
        assert_eq!(options.retry_interval(), Duration::from_millis(100));
        assert_eq!(options.namespace, "lock:");
        assert_eq!(options.busy_message, DEFAULT_BUSY_MESSAGE);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let options = LockOptions::from_lookup(lookup_from(&[
            (ENV_TTL_MS, "10000"),
            (ENV_WAIT_TIMEOUT_MS, "0"),
            (ENV_RETRY_INTERVAL_MS, " 25 "),
            (ENV_NAMESPACE, "mutex:"),
            (ENV_BUSY_MESSAGE, "payment in progress"),
        ]));

        assert_eq!(options.ttl_ms, 10_000);
        assert_eq!(options.wait_timeout_ms, 0);
        assert_eq!(options.retry_interval_ms, 25);
        assert_eq!(options.namespace, "mutex:");
        assert_eq!(options.busy_message, "payment in progress");
    }

    #[test]
    fn test_from_lookup_malformed_number_keeps_default() {
        let options = LockOptions::from_lookup(lookup_from(&[(ENV_TTL_MS, "thirty seconds")]));
        assert_eq!(options.ttl_ms, DEFAULT_TTL_MS);
        assert_eq!(options.wait_timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: LockOptions = serde_json::from_str(r#"{ "ttl_ms": 1500 }"#).unwrap();
        assert_eq!(options.ttl_ms, 1500);
        assert_eq!(options.retry_interval_ms, DEFAULT_RETRY_INTERVAL_MS);
        assert_eq!(options.namespace, "lock:");
    }
}
