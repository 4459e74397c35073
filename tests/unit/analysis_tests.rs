//! Unit tests for body analysis
//!
//! Anti-pattern detection, reference extraction, CRUD and complexity
//! classification, and module assignment.

use pretty_assertions::assert_eq;

use rust_sprocscan::analysis::{
    classify_complexity, classify_crud, detect_anti_patterns, extract_references, AssignmentSource,
    ModuleAssigner,
};
use rust_sprocscan::collaborators::KnownTables;
use rust_sprocscan::config::{ModuleRules, UNCATEGORIZED};
use rust_sprocscan::model::{AntiPatternProfile, Complexity, CrudType};
use rust_sprocscan::parser::strip_comments;

fn known(names: &[&str]) -> KnownTables {
    KnownTables::from_names(names.iter().copied())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Anti-Pattern Tests
// ============================================================================

#[test]
fn test_nolock_hint_counted_once() {
    let profile = detect_anti_patterns(&strip_comments("SELECT * FROM T WITH (NOLOCK)"));
    assert!(profile.has_nolock);
    assert_eq!(profile.nolock_count, 1);
    assert!(profile.has_select_star);
}

#[test]
fn test_nolock_in_comment_ignored() {
    let profile = detect_anti_patterns(&strip_comments("-- WITH (NOLOCK)\nSELECT 1"));
    assert!(!profile.has_nolock);
    assert_eq!(profile.nolock_count, 0);
}

#[test]
fn test_nolock_in_string_literal_ignored() {
    let profile = detect_anti_patterns(&strip_comments("SELECT 'WITH (NOLOCK)'"));
    assert!(!profile.has_nolock);
}

#[test]
fn test_nolock_counts_each_hint() {
    let body = "SELECT a.x FROM A a WITH (NOLOCK) JOIN B b WITH (nolock) ON 1=1 JOIN C c (NOLOCK) ON 1=1";
    let profile = detect_anti_patterns(body);
    assert_eq!(profile.nolock_count, 3);
}

#[test]
fn test_clean_body_only_flags_missing_nocount_and_try() {
    let profile = detect_anti_patterns("SELECT Id FROM Users WHERE Id = @Id");
    assert_eq!(
        profile,
        AntiPatternProfile {
            missing_nocount: true,
            no_try_catch: true,
            ..Default::default()
        }
    );
}

#[test]
fn test_full_profile() {
    let body = r#"
SET NOCOUNT ON
DECLARE @t TABLE (Id INT)
CREATE TABLE #work (Id INT)
DECLARE c CURSOR FOR SELECT Id FROM @t
WHILE @@FETCH_STATUS = 0 BEGIN FETCH NEXT FROM c END
BEGIN TRY
    EXEC sp_executesql @sql
END TRY
BEGIN CATCH
END CATCH
"#;
    let profile = detect_anti_patterns(body);
    assert!(profile.has_cursor);
    assert!(profile.has_table_variable);
    assert!(profile.has_temp_table);
    assert!(profile.has_while_loop);
    assert!(profile.has_dynamic_sql);
    assert!(!profile.missing_nocount);
    assert!(!profile.no_try_catch);
    assert!(!profile.has_select_star);
}

#[test]
fn test_count_star_is_not_select_star() {
    let profile = detect_anti_patterns("SELECT COUNT(*) FROM Users");
    assert!(!profile.has_select_star);
}

// ============================================================================
// Reference Extraction Tests
// ============================================================================

#[test]
fn test_references_sorted_and_deduplicated() {
    let body = "SELECT * FROM dbo.Users u JOIN Orders o ON o.UserId = u.Id\nUPDATE dbo.Users SET x = 1\nEXEC dbo.AuditLog @x\nEXEC sp_rename 'a', 'b'";
    let refs = extract_references(body, "SaveUser", Some(&known(&["Users", "Orders"])));
    assert_eq!(refs.tables, strings(&["Orders", "Users"]));
    assert_eq!(refs.procedures, strings(&["AuditLog"]));
}

#[test]
fn test_unknown_unqualified_tables_dropped_with_known_set() {
    let refs = extract_references(
        "SELECT * FROM Users JOIN Mystery ON 1 = 1",
        "P",
        Some(&known(&["users"])),
    );
    assert_eq!(refs.tables, strings(&["users"]));
}

#[test]
fn test_qualified_tables_kept_without_known_set() {
    let refs = extract_references("SELECT * FROM dbo.Users JOIN Orders ON 1 = 1", "P", None);
    assert_eq!(refs.tables, strings(&["Users"]));
}

#[test]
fn test_temp_tables_variables_and_self_calls_excluded() {
    let body = "INSERT INTO #tmp SELECT * FROM @rows\nEXEC dbo.Recurse\nEXEC @rc = dbo.Other";
    let refs = extract_references(body, "Recurse", None);
    assert!(refs.tables.is_empty());
    assert_eq!(refs.procedures, strings(&["Other"]));
}

#[test]
fn test_references_in_comments_ignored() {
    let body = strip_comments("-- SELECT * FROM dbo.Old\nSELECT 1 /* EXEC dbo.Gone */");
    let refs = extract_references(&body, "P", None);
    assert!(refs.tables.is_empty());
    assert!(refs.procedures.is_empty());
}

// ============================================================================
// CRUD Classification Tests
// ============================================================================

#[test]
fn test_crud_from_name() {
    assert_eq!(classify_crud("GetUserById", "UPDATE T SET x = 1"), CrudType::Get);
    assert_eq!(classify_crud("RPT_Sales", "SELECT 1"), CrudType::Report);
    assert_eq!(classify_crud("InsertOrder", "SELECT 1"), CrudType::Insert);
    assert_eq!(classify_crud("SEC_UpdateRole", "SELECT 1"), CrudType::Update);
    assert_eq!(classify_crud("DeleteUser", "SELECT 1"), CrudType::Delete);
}

#[test]
fn test_crud_from_body_single_update() {
    assert_eq!(
        classify_crud("HandleItems", "UPDATE dbo.Items SET Done = 1 WHERE Id = @Id"),
        CrudType::Update
    );
}

#[test]
fn test_crud_from_body_mixed_mutations() {
    let body = "INSERT INTO Audit (x) VALUES (1)\nUPDATE Items SET Done = 1";
    assert_eq!(classify_crud("HandleItems", body), CrudType::Mixed);
}

#[test]
fn test_crud_from_body_select_only() {
    assert_eq!(classify_crud("UserLookup", "SELECT Id FROM Users"), CrudType::Get);
}

#[test]
fn test_crud_from_body_aggregate_report() {
    let body = "SELECT Region, SUM(Total) FROM Sales GROUP BY Region";
    assert_eq!(classify_crud("SalesByRegion", body), CrudType::Report);
}

#[test]
fn test_crud_unrecognizable_is_mixed() {
    assert_eq!(classify_crud("Ping", "RETURN 0"), CrudType::Mixed);
}

// ============================================================================
// Complexity Tests
// ============================================================================

#[test]
fn test_complexity_tiers() {
    let clean = AntiPatternProfile::default();
    assert_eq!(classify_complexity(5, 1, &clean), Complexity::Trivial);
    assert_eq!(classify_complexity(20, 0, &clean), Complexity::Simple);
    assert_eq!(classify_complexity(49, 3, &clean), Complexity::Moderate);
    assert_eq!(classify_complexity(150, 0, &clean), Complexity::Complex);
    assert_eq!(classify_complexity(500, 0, &clean), Complexity::VeryComplex);
}

#[test]
fn test_cursor_forces_complex() {
    let cursor = AntiPatternProfile {
        has_cursor: true,
        ..Default::default()
    };
    assert_eq!(classify_complexity(3, 0, &cursor), Complexity::Complex);
}

#[test]
fn test_many_tables_with_antipatterns_very_complex() {
    let dense = AntiPatternProfile {
        has_select_star: true,
        has_while_loop: true,
        ..Default::default()
    };
    assert_eq!(classify_complexity(10, 8, &dense), Complexity::VeryComplex);
    assert_eq!(
        classify_complexity(10, 8, &AntiPatternProfile::default()),
        Complexity::Complex
    );
}

// ============================================================================
// Module Assignment Tests
// ============================================================================

#[test]
fn test_prefix_assignment() {
    let assigner = ModuleAssigner::new(&ModuleRules::default());
    let a = assigner.assign("APE2_GetReviews", &[], None);
    assert_eq!(a.key, "APE2");
    assert_eq!(a.source, AssignmentSource::NamePrefix);
    assert_eq!(assigner.assign("APE_Save", &[], None).key, "APE");
    assert_eq!(assigner.assign("SECURITY_Audit", &[], None).key, "SEC");
}

#[test]
fn test_prefix_needs_boundary() {
    let assigner = ModuleAssigner::new(&ModuleRules::default());
    let a = assigner.assign("Secretariat", &[], None);
    assert_eq!(a.key, UNCATEGORIZED);
    assert_eq!(a.source, AssignmentSource::Uncategorized);

    let a = assigner.assign("LOGIN_Check", &[], None);
    assert_eq!(a.key, UNCATEGORIZED);
}

#[test]
fn test_cross_reference_hint_before_tables() {
    let assigner = ModuleAssigner::new(&ModuleRules::default());
    let a = assigner.assign("Cleanup", &strings(&["SEC_Users"]), Some("finance"));
    assert_eq!(a.key, "FIN");
    assert_eq!(a.source, AssignmentSource::CrossReference);
}

#[test]
fn test_table_majority_fallback() {
    let assigner = ModuleAssigner::new(&ModuleRules::default());
    let tables = strings(&["EVAL_Scores", "SEC_Roles", "SEC_UserRoles", "SEC_Users"]);
    let a = assigner.assign("Xyz_DoThing", &tables, None);
    assert_eq!(a.key, "SEC");
    assert_eq!(a.source, AssignmentSource::TableMajority);
}

#[test]
fn test_no_signal_is_uncategorized() {
    let assigner = ModuleAssigner::new(&ModuleRules::default());
    let a = assigner.assign("Ping", &strings(&["Widgets"]), None);
    assert_eq!(a.key, UNCATEGORIZED);
}
