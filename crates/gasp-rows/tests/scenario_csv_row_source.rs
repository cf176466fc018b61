//! CsvRowSource reads one exported CSV per sheet and validates them together.

use gasp_rows::{CsvRowSource, RowSource, RowSourceError, SheetType};
use std::fs;

fn write_sheets(dir: &std::path::Path, order_csv: &str, lineitem_csv: &str, creative_csv: &str) {
    fs::write(dir.join("order.csv"), order_csv).unwrap();
    fs::write(dir.join("lineitem.csv"), lineitem_csv).unwrap();
    fs::write(dir.join("creative.csv"), creative_csv).unwrap();
}

const ORDERS: &str = "name,advertiser_name,trafficker_name\n\
O1,Acme,Jo\n\
# O-disabled,Acme,Jo\n";

const LINEITEMS: &str = "order_name,name,sizes,costPerUnit,targetingUnit,targetingKeyValue1\n\
O1,L1,\"300x250,728x90\",1.25,\"111,222\",region!=US\n";

const CREATIVES: &str = "order_name,lineitem_name,name,snippet\n\
O1,L1,C1,\"<div class=\"\"ad\"\"></div>\"\n";

#[test]
fn fetch_rows_reads_quoted_cells_and_skips_comments() {
    let dir = tempfile::tempdir().unwrap();
    write_sheets(dir.path(), ORDERS, LINEITEMS, CREATIVES);
    let source = CsvRowSource::new(dir.path());

    let orders = source.fetch_rows(SheetType::Order).unwrap();
    assert_eq!(orders.len(), 1);

    let lineitems = source.fetch_rows(SheetType::LineItem).unwrap();
    assert_eq!(lineitems[0].get("sizes"), Some("300x250,728x90"));
    assert_eq!(lineitems[0].get("targetingUnit"), Some("111,222"));

    let creatives = source.fetch_rows(SheetType::Creative).unwrap();
    assert_eq!(creatives[0].get("snippet"), Some("<div class=\"ad\"></div>"));
}

#[test]
fn check_settings_passes_for_consistent_sheets() {
    let dir = tempfile::tempdir().unwrap();
    write_sheets(dir.path(), ORDERS, LINEITEMS, CREATIVES);
    let keys = CsvRowSource::new(dir.path()).check_settings().unwrap();
    assert_eq!(keys.order_names.len(), 1);
    assert_eq!(keys.creative_names.len(), 1);
}

#[test]
fn check_settings_surfaces_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let bad_creatives = "order_name,lineitem_name,name,snippet\nO1,L9,C1,<div></div>\n";
    write_sheets(dir.path(), ORDERS, LINEITEMS, bad_creatives);

    let err = CsvRowSource::new(dir.path()).check_settings().unwrap_err();
    assert!(matches!(err, RowSourceError::Validation(_)));
    assert!(err.to_string().contains("creative row 2"), "got: {err}");
}

#[test]
fn missing_sheet_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CsvRowSource::new(dir.path())
        .fetch_rows(SheetType::Order)
        .unwrap_err();
    assert!(matches!(err, RowSourceError::Io { sheet: SheetType::Order, .. }));
}
