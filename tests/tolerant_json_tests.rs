//! Tolerant parsing of damaged response bodies.

use pretty_assertions::assert_eq;
use serde_json::json;

use clinic_client::json::{parse_tolerant, JsonRepairError};

#[test]
fn trailing_bytes_recover_the_clean_prefix() {
    let clean = r#"{"id":7,"visits":[{"id":1},{"id":2}],"notes":"ok"}"#;
    for garbage in ["garbage", "}}}", "\n<br/>", "\u{0}\u{1}", r#"{"second":true}"#] {
        let damaged = format!("{clean}{garbage}");
        assert_eq!(
            parse_tolerant(&damaged).unwrap(),
            parse_tolerant(clean).unwrap(),
            "suffix {garbage:?}"
        );
    }
}

#[test]
fn html_pages_are_reported_as_html() {
    for page in [
        "<!DOCTYPE html><html><body>502 Bad Gateway</body></html>",
        "<html><head><title>Error</title></head></html>",
        "  <!doctype HTML>\n<p>{\"looks\":\"like json\"}</p>",
    ] {
        assert!(matches!(parse_tolerant(page), Err(JsonRepairError::Html)), "{page}");
    }
}

#[test]
fn leading_noise_before_an_object_is_skipped() {
    let value = parse_tolerant("warning: slow query\n{\"id\":3}").unwrap();
    assert_eq!(value, json!({"id": 3}));
}

#[test]
fn bare_arrays_are_extracted() {
    let value = parse_tolerant("data: [1, 2, 3] (end)").unwrap();
    assert_eq!(value, json!([1, 2, 3]));
}

#[test]
fn control_characters_inside_strings_are_sanitized() {
    let value = parse_tolerant("{\"notes\":\"iop\u{b}high\u{c}review\tsoon\"}").unwrap();
    assert_eq!(value["notes"], "iop high review soon");
}

#[test]
fn unrecoverable_input_names_the_original_error() {
    match parse_tolerant(r#"{"id": 7, "name": "#) {
        Err(JsonRepairError::Syntax(message)) => {
            assert!(message.contains("EOF"), "{message}");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn blank_input_is_empty() {
    assert!(matches!(parse_tolerant(" \n\t "), Err(JsonRepairError::Empty)));
}
