//! Integration tests for the extract run
//!
//! These run the whole pipeline against the sample dump and inspect the
//! written JSON documents.

use std::fs;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use rust_sprocscan::output::{render_catalog, CATALOG_FILE};
use rust_sprocscan::parser::{read_source, InputEncoding};
use rust_sprocscan::{analyze_source, run_extract, Collaborators, ExtractOptions};

use crate::common::{fixture_text, procedure_with_body_lines, utf16le_with_bom, TestContext};

fn module_keys(catalog: &Value) -> Vec<String> {
    catalog["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["key"].as_str().unwrap().to_string())
        .collect()
}

fn find_procedure<'v>(catalog: &'v Value, name: &str) -> &'v Value {
    catalog["modules"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|m| m["procedures"].as_array().unwrap())
        .find(|p| p["name"] == name)
        .unwrap_or_else(|| panic!("procedure {name} not in catalog"))
}

// ============================================================================
// Output Layout Tests
// ============================================================================

#[test]
fn test_extract_writes_catalog_and_module_files() {
    let ctx = TestContext::with_fixture("sample_dump");
    let written = run_extract(&ctx.extract_options()).unwrap();

    assert_eq!(written.catalog, ctx.output_dir().join(CATALOG_FILE));
    assert!(written.catalog.exists());

    let mut files: Vec<String> = fs::read_dir(ctx.output_dir().join("modules"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec!["LOG.json", "RPT.json", "SEC.json", "uncategorized.json"]
    );
    assert_eq!(written.modules.len(), 4);
}

#[test]
fn test_modules_sorted_with_uncategorized_last() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);

    assert_eq!(
        module_keys(&catalog),
        vec!["LOG", "RPT", "SEC", "(uncategorized)"]
    );
    assert_eq!(catalog["modules"][2]["displayName"], "Security");
    assert_eq!(catalog["modules"][3]["displayName"], "Uncategorized");

    let sec: Vec<&str> = catalog["modules"][2]["procedures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(sec, vec!["GetUserById", "SEC_SaveUser", "Xyz_DoThing"]);
}

// ============================================================================
// Statistics and Metadata Tests
// ============================================================================

#[test]
fn test_statistics() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);
    let stats = &catalog["statistics"];

    assert_eq!(stats["totalProcedures"], 6);
    assert_eq!(stats["totalModules"], 4);
    assert_eq!(stats["parseFailures"], 1);
    assert_eq!(stats["degradedSignatures"], 0);
    assert_eq!(stats["bySchema"], json!({"dbo": 5, "sec": 1}));
    assert_eq!(
        stats["byCrudType"],
        json!({"delete": 1, "get": 2, "mixed": 2, "report": 1})
    );
    assert_eq!(
        stats["byComplexity"],
        json!({"complex": 1, "moderate": 1, "trivial": 4})
    );
    assert_eq!(stats["antiPatterns"]["nolock"], 1);
    assert_eq!(stats["antiPatterns"]["nolockHints"], 1);
    assert_eq!(stats["antiPatterns"]["cursor"], 1);
    assert_eq!(stats["antiPatterns"]["selectStar"], 0);
}

#[test]
fn test_metadata() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);
    let meta = &catalog["exportMetadata"];

    assert_eq!(meta["encoding"], "UTF-8");
    assert_eq!(meta["totalBatches"], 10);
    assert_eq!(meta["procedureBlocks"], 7);
    assert_eq!(meta["parsedProcedures"], 6);
    assert_eq!(meta["parseFailures"], 1);
    assert_eq!(meta["knownTablesLoaded"], true);
    assert_eq!(meta["callerXrefLoaded"], true);
    assert_eq!(meta["toolVersion"], env!("CARGO_PKG_VERSION"));
    assert_eq!(meta["sourceSha256"].as_str().unwrap().len(), 64);
    assert!(meta["generatedAt"].is_string());
}

#[test]
fn test_every_block_accounted_for() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);

    let listed: u64 = catalog["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            let count = m["procedureCount"].as_u64().unwrap();
            assert_eq!(count as usize, m["procedures"].as_array().unwrap().len());
            count
        })
        .sum();
    let meta = &catalog["exportMetadata"];

    assert_eq!(listed, catalog["statistics"]["totalProcedures"].as_u64().unwrap());
    assert_eq!(
        meta["parsedProcedures"].as_u64().unwrap() + meta["parseFailures"].as_u64().unwrap(),
        meta["procedureBlocks"].as_u64().unwrap()
    );
}

// ============================================================================
// Procedure Record Tests
// ============================================================================

#[test]
fn test_procedure_summary_fields() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);

    let save = find_procedure(&catalog, "SEC_SaveUser");
    assert_eq!(save["schema"], "sec");
    assert_eq!(save["fullName"], "sec.SEC_SaveUser");
    assert_eq!(save["crudType"], "mixed");
    assert_eq!(save["sprocsCalled"], json!(["SEC_Audit"]));
    assert_eq!(save["tablesReferenced"], json!(["SEC_Users"]));
    assert_eq!(
        save["parameters"],
        json!([
            {"name": "@Id", "dataType": "INT", "direction": "IN", "readonly": false},
            {"name": "@Name", "dataType": "NVARCHAR(100)", "direction": "IN", "defaultValue": "NULL", "readonly": false},
            {"name": "@Result", "dataType": "INT", "direction": "OUTPUT", "readonly": false},
        ])
    );
    assert!(save.get("body").is_none());

    let report = find_procedure(&catalog, "RPT_SalesByRegion");
    assert_eq!(report["parameters"][1]["defaultValue"], "'2099-12-31'");
    assert_eq!(report["antiPatterns"]["hasSelectStar"], false);

    let get_user = find_procedure(&catalog, "GetUserById");
    assert_eq!(get_user["calledFromCode"], json!(["UserService.cs::Load [Web]"]));
    assert_eq!(get_user["antiPatterns"]["missingNocount"], false);
    assert_eq!(find_procedure(&catalog, "Ping")["calledFromCode"], json!([]));
}

#[test]
fn test_module_file_holds_full_bodies() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let log = ctx.read_output_json("modules/LOG.json");

    assert_eq!(log["key"], "LOG");
    assert_eq!(log["displayName"], "Logging");
    let body = log["procedures"][0]["body"].as_str().unwrap();
    assert!(body.starts_with("BEGIN TRY"));
    assert!(body.ends_with("END CATCH"));
    assert!(body.contains("DELETE FROM dbo.LOG_Entries"));
}

#[test]
fn test_preview_is_bounded() {
    let ctx = TestContext::empty();
    let sql = procedure_with_body_lines("LongOne", 120);
    ctx.write("dump.sql", &sql);

    let mut options = ExtractOptions::new(ctx.dump_path(), ctx.output_dir());
    options.preview_lines = 10;
    run_extract(&options).unwrap();

    let catalog = ctx.read_output_json(CATALOG_FILE);
    let p = find_procedure(&catalog, "LongOne");
    assert_eq!(p["lineCount"], 120);
    assert_eq!(p["bodyPreview"].as_str().unwrap().lines().count(), 10);

    let full = ctx.read_output_json("modules/uncategorized.json");
    assert_eq!(
        full["procedures"][0]["body"].as_str().unwrap().lines().count(),
        120
    );
}

// ============================================================================
// Degraded Input Tests
// ============================================================================

#[test]
fn test_without_collaborators() {
    let ctx = TestContext::with_fixture("sample_dump");
    let options = ExtractOptions::new(ctx.dump_path(), ctx.output_dir());
    run_extract(&options).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);

    assert_eq!(catalog["statistics"]["totalProcedures"], 6);
    assert_eq!(catalog["exportMetadata"]["knownTablesLoaded"], false);
    assert_eq!(catalog["exportMetadata"]["callerXrefLoaded"], false);

    let get_user = find_procedure(&catalog, "GetUserById");
    assert!(get_user.get("calledFromCode").is_none());
    // Unqualified references need the known-table set
    assert_eq!(get_user["tablesReferenced"], json!([]));

    // Qualified references still resolve, and drive table-majority assignment
    let cleanup = find_procedure(&catalog, "Legacy_Cleanup");
    assert_eq!(cleanup["tablesReferenced"], json!(["LOG_Entries"]));
    assert!(module_keys(&catalog).contains(&"LOG".to_string()));
}

#[test]
fn test_unreadable_collaborators_degrade() {
    let ctx = TestContext::with_fixture("sample_dump");
    ctx.write("known_tables.json", "{ not json");
    let mut options = ctx.extract_options();
    options.callers_path = Some(ctx.path("missing_callers.json"));

    run_extract(&options).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);
    assert_eq!(catalog["exportMetadata"]["knownTablesLoaded"], false);
    assert_eq!(catalog["exportMetadata"]["callerXrefLoaded"], false);
    assert_eq!(catalog["statistics"]["totalProcedures"], 6);
}

#[test]
fn test_missing_input_is_an_error() {
    let ctx = TestContext::empty();
    let options = ExtractOptions::new(ctx.path("nope.sql"), ctx.output_dir());
    assert!(run_extract(&options).is_err());
    assert!(!ctx.output_dir().join(CATALOG_FILE).exists());
}

#[test]
fn test_bad_rules_file_is_an_error() {
    let ctx = TestContext::with_fixture("sample_dump");
    ctx.write("rules.toml", "prefixes = 42");
    let mut options = ctx.extract_options();
    options.rules_path = Some(ctx.path("rules.toml"));
    assert!(run_extract(&options).is_err());
}

#[test]
fn test_utf16_dump_matches_utf8() {
    let ctx = TestContext::with_fixture("sample_dump");
    run_extract(&ctx.extract_options()).unwrap();
    let utf8 = ctx.read_output_json(CATALOG_FILE);

    let dump = fixture_text("sample_dump", "dump.sql");
    ctx.write("dump.sql", utf16le_with_bom(&dump));
    let mut options = ctx.extract_options();
    options.output_dir = ctx.path("out16");
    run_extract(&options).unwrap();
    let utf16 = crate::common::read_json(&ctx.path("out16").join(CATALOG_FILE));

    assert_eq!(utf16["exportMetadata"]["encoding"], "UTF-16LE");
    assert_eq!(utf16["statistics"], utf8["statistics"]);
    assert_eq!(utf16["modules"], utf8["modules"]);
    assert_eq!(
        utf16["exportMetadata"]["sourceSha256"],
        utf8["exportMetadata"]["sourceSha256"]
    );
}

// ============================================================================
// Rules and Determinism Tests
// ============================================================================

#[test]
fn test_custom_rules() {
    let ctx = TestContext::with_fixture("sample_dump");
    let mut options = ctx.extract_options();
    options.rules_path = Some(ctx.path("rules.toml"));
    run_extract(&options).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);

    let xyz = catalog["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["key"] == "XYZ")
        .expect("XYZ module");
    assert_eq!(xyz["displayName"], "Experimental");
    assert_eq!(xyz["procedures"][0]["name"], "Xyz_DoThing");
    assert!(ctx.output_dir().join("modules").join("XYZ.json").exists());
}

/// A dump large enough to take the parallel path
fn synthetic_dump(procedures: usize) -> String {
    let prefixes = ["SEC", "EVAL", "FIN", "Misc"];
    (0..procedures)
        .map(|i| {
            let prefix = prefixes[i % prefixes.len()];
            format!(
                "CREATE PROCEDURE dbo.{prefix}_Get{i}\n    @Id INT\nAS\nSELECT * FROM dbo.{prefix}_Table{} WITH (NOLOCK) WHERE Id = @Id\nGO\n",
                i % 7
            )
        })
        .collect()
}

#[test]
fn test_catalog_independent_of_worker_count() {
    let ctx = TestContext::empty();
    let path = ctx.write("dump.sql", synthetic_dump(64));
    let source = read_source(&path, InputEncoding::Auto).unwrap();
    let collaborators = Collaborators::default();

    let render_with = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        let catalog = analyze_source(&source, "dump.sql", &collaborators, 50, Some(&pool));
        render_catalog(&catalog).unwrap()
    };

    let single = render_with(1);
    assert_eq!(single, render_with(4));
    assert_eq!(single, render_with(1));

    let catalog: Value = serde_json::from_str(&single).unwrap();
    assert_eq!(catalog["statistics"]["totalProcedures"], 64);
    assert_eq!(
        module_keys(&catalog),
        vec!["EVAL", "FIN", "SEC", "(uncategorized)"]
    );
}

#[test]
fn test_jobs_option() {
    let ctx = TestContext::with_fixture("sample_dump");
    let mut options = ctx.extract_options();
    options.jobs = Some(2);
    run_extract(&options).unwrap();
    let catalog = ctx.read_output_json(CATALOG_FILE);
    assert_eq!(catalog["statistics"]["totalProcedures"], 6);
}
