//! Integration tests for the show run

use pretty_assertions::assert_eq;
use serde_json::Value;

use rust_sprocscan::parser::InputEncoding;
use rust_sprocscan::{run_show, ShowOptions};

use crate::common::TestContext;

fn show(ctx: &TestContext, name: &str) -> Value {
    let options = ShowOptions {
        input_path: ctx.dump_path(),
        name: name.to_string(),
        known_tables_path: Some(ctx.path("known_tables.json")),
        callers_path: Some(ctx.path("callers.json")),
        rules_path: None,
        encoding: InputEncoding::Auto,
    };
    serde_json::from_str(&run_show(&options).unwrap()).unwrap()
}

#[test]
fn test_show_qualified_name() {
    let ctx = TestContext::with_fixture("sample_dump");
    let records = show(&ctx, "sec.SEC_SaveUser");
    let records = records.as_array().unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["module"], "SEC");
    assert_eq!(record["startLine"], 19);
    assert_eq!(record["fullName"], "sec.SEC_SaveUser");
    assert_eq!(record["parameters"].as_array().unwrap().len(), 3);
    let body = record["body"].as_str().unwrap();
    assert!(body.contains("EXEC dbo.SEC_Audit @Id"));
    assert_eq!(record["bodyPreview"], record["body"]);
}

#[test]
fn test_show_bare_name_is_case_insensitive() {
    let ctx = TestContext::with_fixture("sample_dump");
    let records = show(&ctx, "legacy_cleanup");
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["crudType"], "delete");
    assert_eq!(records[0]["complexity"], "complex");
}

#[test]
fn test_show_wrong_schema_matches_nothing() {
    let ctx = TestContext::with_fixture("sample_dump");
    let records = show(&ctx, "dbo.SEC_SaveUser");
    assert!(records.as_array().unwrap().is_empty());
}
