//! End-to-end stamping over a realistic template

mod common;

use docstamp::prelude::*;
use docstamp::PackageTree;
use pretty_assertions::assert_eq;

fn order_variant() -> DocumentVariant {
    let mut fields = FieldMap::new();
    fields.bind("customer_name", CellAddress::parse("B2").unwrap(), FieldKind::Text);
    fields.bind("issue_date", CellAddress::parse("D4").unwrap(), FieldKind::Date);
    fields.bind("total", CellAddress::parse("K29").unwrap(), FieldKind::Number);
    DocumentVariant::new(0, "Order Final").with_field_map(fields)
}

fn order_data() -> DataDictionary {
    let mut data = DataDictionary::new();
    data.insert("customer_name", "Acme Co.");
    data.insert("issue_date", chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    data.insert("total", 1500.0);
    data.insert("tax_rate", 0.21);
    data
}

fn stamp_order() -> (PackageTree, StampStats) {
    let fallback = FallbackResolver::new().rule("TaxTable", "tax_rate", FieldKind::Number);
    let outcome = Stamper::with_fallback(fallback)
        .stamp(&common::order_template(), &order_variant(), &order_data())
        .unwrap();
    (PackageTree::extract(&outcome.bytes).unwrap(), outcome.stats)
}

#[test]
fn test_fields_and_formulas_become_literals() {
    let (tree, stats) = stamp_order();
    let sheet = tree.read_part("xl/worksheets/sheet1.xml").unwrap();

    // bound formula cell takes the field value as an inline string
    assert!(sheet.contains(r#"<c r="B2" s="1" t="inlineStr"><is><t>Acme Co.</t></is></c>"#));
    // date field lands as a day serial, style preserved, no string tag
    assert!(sheet.contains(r#"<c r="D4" s="2"><v>44927</v></c>"#));
    // explicit write over a t="s" cell drops the stale type attribute
    assert!(sheet.contains(r#"<c r="K29" s="3"><v>1500</v></c>"#));
    // fallback-resolved formula
    assert!(sheet.contains(r#"<c r="K30"><v>0.21</v></c>"#));
    // unresolvable NOW() is blanked, not left live
    assert!(sheet.contains(r#"<c r="K31" t="inlineStr"><is><t></t></is></c>"#));

    assert!(!sheet.contains("<f"));
    assert_eq!(
        stats,
        StampStats { formulas_excised: 4, fields_written: 3, resolution_gaps: 1 }
    );
}

#[test]
fn test_output_is_a_single_sheet_package() {
    let (tree, _) = stamp_order();

    let parts = tree.part_names().unwrap();
    let sheets: Vec<_> = parts
        .iter()
        .filter(|p| p.starts_with("xl/worksheets/") && !p.contains("_rels"))
        .collect();
    assert_eq!(sheets, vec!["xl/worksheets/sheet1.xml"]);

    let workbook = tree.read_part("xl/workbook.xml").unwrap();
    assert!(workbook.contains(r#"<sheet name="Order Final" sheetId="1" r:id="rId1"/>"#));
    assert_eq!(workbook.matches("<sheet ").count(), 1);
}

#[test]
fn test_volatile_artifacts_are_gone() {
    let (tree, _) = stamp_order();
    let parts = tree.part_names().unwrap();

    assert!(!parts.iter().any(|p| p.contains("calcChain")));
    assert!(!parts.iter().any(|p| p.contains("drawings")));
    assert!(!parts.iter().any(|p| p.contains("printerSettings")));

    let workbook = tree.read_part("xl/workbook.xml").unwrap();
    assert!(!workbook.contains("definedNames"));

    let sheet = tree.read_part("xl/worksheets/sheet1.xml").unwrap();
    assert!(!sheet.contains("<drawing"));
    assert!(!sheet.contains(r#"r:id"#));
}

/// Every relationship target must exist and every part must be declared,
/// or consumers report the file as needing repair.
#[test]
fn test_package_metadata_is_consistent() {
    let (tree, _) = stamp_order();
    let parts = tree.part_names().unwrap();

    let types = tree.read_part("[Content_Types].xml").unwrap();
    for part in parts.iter().filter(|p| p.ends_with(".xml") && !p.ends_with(".rels")) {
        if part == "[Content_Types].xml" {
            continue;
        }
        assert!(
            types.contains(&format!(r#"PartName="/{part}""#)),
            "part {part} missing from content types"
        );
    }
    assert!(!types.contains("/xl/worksheets/sheet2.xml"));
    assert!(!types.contains("calcChain"));

    let rels = tree.read_part("xl/_rels/workbook.xml.rels").unwrap();
    for target in ["worksheets/sheet1.xml", "styles.xml", "sharedStrings.xml"] {
        assert!(rels.contains(&format!(r#"Target="{target}""#)));
    }
    assert!(!rels.contains("sheet2"));
    assert!(!rels.contains("calcChain"));
}

#[test]
fn test_keeping_a_helper_sheet_variant() {
    // stamping can target any sheet, not just the first
    let variant = DocumentVariant::new(2, "Terms");
    let outcome = Stamper::new()
        .stamp(&common::order_template(), &variant, &DataDictionary::new())
        .unwrap();

    let tree = PackageTree::extract(&outcome.bytes).unwrap();
    let workbook = tree.read_part("xl/workbook.xml").unwrap();
    assert!(workbook.contains(r#"name="Terms""#));
    assert!(tree.read_part("xl/worksheets/sheet1.xml").is_ok());
}

#[test]
fn test_page_layout_applied_to_survivor() {
    let layout = PageLayout {
        print_area: Some(CellRange::parse("A1:K40").unwrap()),
        hidden_cols: None,
        fit_to_page: true,
    };
    let variant = order_variant().with_layout(layout);

    let outcome = Stamper::new()
        .stamp(&common::order_template(), &variant, &order_data())
        .unwrap();

    let tree = PackageTree::extract(&outcome.bytes).unwrap();
    let sheet = tree.read_part("xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(r#"<col min="12" max="16384" hidden="1"/>"#));
    assert!(sheet.contains(r#"fitToPage="1""#));
    assert!(sheet.contains(r#"fitToWidth="1""#));
}

#[test]
fn test_stamping_is_stable_over_its_own_output() {
    // a stamped package is itself a valid template with nothing to excise
    let (tree, _) = stamp_order();
    let bytes = tree.repack().unwrap();

    let variant = DocumentVariant::new(0, "Order Final");
    let outcome = Stamper::new()
        .stamp(&bytes, &variant, &DataDictionary::new())
        .unwrap();
    assert_eq!(outcome.stats.formulas_excised, 0);
    assert_eq!(outcome.stats.resolution_gaps, 0);

    let again = PackageTree::extract(&outcome.bytes).unwrap();
    let sheet = again.read_part("xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains("Acme Co."));
    assert!(sheet.contains("<v>1500</v>"));
}

#[test]
fn test_stamp_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("order.xlsx");
    std::fs::write(&template_path, common::order_template()).unwrap();

    let out_path = dir.path().join("stamped.xlsx");
    let stats = Stamper::new()
        .stamp_file(&template_path, &out_path, &order_variant(), &order_data())
        .unwrap();
    assert_eq!(stats.fields_written, 3);

    let tree = PackageTree::extract_file(&out_path).unwrap();
    let sheet = tree.read_part("xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains("Acme Co."));
}

#[test]
fn test_bad_inputs_fail_fast() {
    let err = Stamper::new()
        .stamp(b"not a zip archive", &order_variant(), &order_data())
        .unwrap_err();
    assert!(matches!(err, StampError::Zip(_) | StampError::InvalidPackage(_)));

    let variant = DocumentVariant::new(9, "Order Final");
    let err = Stamper::new()
        .stamp(&common::order_template(), &variant, &order_data())
        .unwrap_err();
    assert!(matches!(err, StampError::InvalidPackage(_)));
}
