use std::collections::HashSet;

use relay_diagnosis::BodySource;
use relay_diagnosis::SafeParseResult;
use relay_diagnosis::safe_parse_body;
use relay_diagnosis::safe_parse_text;
use serde_json::Value;

#[test]
fn each_malformed_shape_gets_a_distinct_code() {
    let bodies = [
        "",
        "<!DOCTYPE html><html><title>Bad gateway</title></html>",
        r#"{"items":[1,2,"#,
        "definitely not json",
    ];
    let codes: HashSet<String> = bodies
        .iter()
        .map(|body| {
            let result: SafeParseResult<Value> = safe_parse_text(body, "feed");
            assert!(!result.ok, "{body:?} should fail");
            assert!(result.data.is_none());
            result.error_code
        })
        .collect();
    assert_eq!(codes.len(), bodies.len());
    assert!(codes.contains("FEED_PARSE_ERROR"));
}

#[test]
fn string_source_is_consumed_once() {
    let mut body = r#"{"ok":true}"#.to_string();
    let first: SafeParseResult<Value> = safe_parse_body(&mut body, "status");
    assert!(first.ok);
    assert_eq!(body.read_text().as_deref(), Ok(""));
}

#[test]
fn arbitrary_bytes_never_panic() {
    let inputs = ["\u{0}", "{", "[", "\"", "<", "   <", "nul", "1e999999", "{\"a\":}"];
    for input in inputs {
        let result: SafeParseResult<Value> = safe_parse_text(input, "");
        if !result.ok {
            assert!(!result.error_code.is_empty(), "{input:?}");
        }
    }
}
