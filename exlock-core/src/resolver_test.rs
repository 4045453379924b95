#[cfg(test)]
mod tests {
    use crate::resolver::{KeyResolver, LOCK_NAMESPACE, namespaced, parse_path};
    use serde_json::json;

    fn resolve(template: &str, args: &[serde_json::Value]) -> String {
        KeyResolver::new().resolve(template, args)
    }

    #[test]
    fn test_bare_index() {
        assert_eq!(resolve("user:#{0}", &[json!("abc")]), "user:abc");
        assert_eq!(resolve("#{1}-#{0}", &[json!("a"), json!("b")]), "b-a");
    }

    #[test]
    fn test_indexed_path() {
        let args = [json!("x"), json!({ "book": { "title": "T" } })];
        assert_eq!(resolve("order:#{1.book.title}", &args), "order:T");
    }

    #[test]
    fn test_implicit_index_path() {
        let args = [json!({ "user": { "id": "42" } })];
        assert_eq!(resolve("cache:#{user.id}", &args), "cache:42");
    }

    #[test]
    fn test_deep_path() {
        let args = [json!({ "user": { "profile": { "name": "John" } } })];
        assert_eq!(resolve("cache:#{user.profile.name}", &args), "cache:John");
    }

    #[test]
    fn test_missing_path_left_literal() {
        assert_eq!(resolve("k:#{a.b}", &[json!({})]), "k:#{a.b}");
        // Absent intermediate object
        assert_eq!(resolve("k:#{a.b.c}", &[json!({ "a": 1 })]), "k:#{a.b.c}");
    }

    #[test]
    fn test_out_of_range_left_literal() {
        assert_eq!(resolve("k:#{3}", &[json!("a")]), "k:#{3}");
        assert_eq!(resolve("k:#{2.id}", &[json!({ "id": 1 })]), "k:#{2.id}");
        assert_eq!(resolve("k:#{id}", &[]), "k:#{id}");
        assert_eq!(
            resolve("k:#{99999999999999999999999}", &[json!("a")]),
            "k:#{99999999999999999999999}"
        );
    }

    #[test]
    fn test_null_path_value_left_literal() {
        let args = [json!({ "user": { "id": null } })];
        assert_eq!(resolve("k:#{user.id}", &args), "k:#{user.id}");
    }

    #[test]
    fn test_bare_index_renders_any_value() {
        let args = [json!(null), json!(7), json!(true), json!(1.5)];
        assert_eq!(resolve("#{0}|#{1}|#{2}|#{3}", &args), "null|7|true|1.5");
    }

    #[test]
    fn test_compound_values_render_as_json() {
        let args = [json!({ "ids": [1, 2] })];
        assert_eq!(resolve("k:#{ids}", &args), "k:[1,2]");
        assert_eq!(resolve("k:#{0}", &args), r#"k:{"ids":[1,2]}"#);
    }

    #[test]
    fn test_mixed_placeholders() {
        let args = [
            json!({ "status": "paid" }),
            json!({ "user": { "id": "u1" } }),
        ];
        assert_eq!(
            resolve("order:#{0.status}:#{status}:#{1.user.id}", &args),
            "order:paid:paid:u1"
        );
    }

    #[test]
    fn test_array_segments() {
        let args = [json!({ "items": [{ "sku": "A" }, { "sku": "B" }] })];
        assert_eq!(resolve("sku:#{items.1.sku}", &args), "sku:B");
        assert_eq!(resolve("sku:#{items[0].sku}", &args), "sku:A");
        assert_eq!(resolve("sku:#{items.5.sku}", &args), "sku:#{items.5.sku}");
    }

    #[test]
    fn test_substituted_text_not_expanded_again() {
        let args = [json!("#{1}"), json!("second")];
        assert_eq!(resolve("k:#{0}", &args), "k:#{1}");

        let args = [json!({ "name": "#{0}" })];
        assert_eq!(resolve("k:#{name}", &args), "k:#{0}");
    }

    #[test]
    fn test_repeated_placeholder() {
        assert_eq!(resolve("#{0}:#{0}", &[json!("a")]), "a:a");
    }

    #[test]
    fn test_no_placeholders_or_empty_braces() {
        assert_eq!(resolve("plain-key", &[json!("a")]), "plain-key");
        assert_eq!(resolve("k:#{}", &[json!("a")]), "k:#{}");
        assert_eq!(resolve("k:#{0", &[json!("a")]), "k:#{0");
    }

    #[test]
    fn test_numeric_object_key_via_path() {
        let args = [json!({ "2024": { "q1": "closed" } })];
        assert_eq!(resolve("report:#{0.2024.q1}", &args), "report:closed");
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("a.b"), Some(vec!["a", "b"]));
        assert_eq!(parse_path("a[0].b"), Some(vec!["a", "0", "b"]));
        assert_eq!(parse_path("a[0][1]"), Some(vec!["a", "0", "1"]));
        assert_eq!(parse_path("a..b"), None);
        assert_eq!(parse_path("a."), None);
        assert_eq!(parse_path("a[0"), None);
        assert_eq!(parse_path("a[]"), None);
        assert_eq!(parse_path("a[0]b"), None);
    }

    #[test]
    fn test_namespaced() {
        assert_eq!(namespaced("user:1", LOCK_NAMESPACE), "lock:user:1");
        assert_eq!(namespaced("lock:payment:1", LOCK_NAMESPACE), "lock:payment:1");
        assert_eq!(namespaced("k", ""), "k");
    }
}
