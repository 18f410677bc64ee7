//! Row iterator tests

use super::*;
use crate::store::UploadStore;
use tempfile::TempDir;

fn ingest(bytes: &[u8]) -> (TempDir, std::sync::Arc<crate::UploadDescriptor>) {
    let dir = TempDir::new().unwrap();
    let store = UploadStore::new(dir.path()).unwrap();
    let descriptor = store.ingest("rows.csv", bytes).unwrap();
    (dir, descriptor)
}

#[test]
fn test_rows_in_order() {
    let (_dir, descriptor) = ingest(b"ox,oy\n1,2\n3,4\n5,6\n");
    let rows: Vec<_> = RowIterator::open(&descriptor)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.index(), i as u64);
        let TableRow::Values { fields, .. } = row else {
            panic!("expected values row");
        };
        assert!(fields.contains_key("ox"));
        assert!(fields.contains_key("oy"));
    }
}

#[test]
fn test_values_are_trimmed() {
    let (_dir, descriptor) = ingest(b"ox,oy\n 1.5 , 2.5 \n");
    let row = RowIterator::open(&descriptor).unwrap().next().unwrap().unwrap();
    let TableRow::Values { fields, .. } = row else {
        panic!("expected values row");
    };
    assert_eq!(fields["ox"], "1.5");
    assert_eq!(fields["oy"], "2.5");
}

#[test]
fn test_all_empty_fields_is_malformed() {
    let (_dir, descriptor) = ingest(b"ox,oy\n1,2\n,\n3,4\n");
    let rows: Vec<_> = RowIterator::open(&descriptor)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(rows.len(), 3);
    assert!(matches!(rows[1], TableRow::Malformed { index: 1, .. }));
    assert!(matches!(rows[2], TableRow::Values { index: 2, .. }));
}

#[test]
fn test_short_record_omits_missing_columns() {
    let (_dir, descriptor) = ingest(b"ox,oy,dx,dy\n1,2\n");
    let row = RowIterator::open(&descriptor).unwrap().next().unwrap().unwrap();
    let TableRow::Values { fields, .. } = row else {
        panic!("expected values row");
    };
    assert_eq!(fields.len(), 2);
    assert!(!fields.contains_key("dx"));
}

#[test]
fn test_iterator_is_finite() {
    let (_dir, descriptor) = ingest(b"ox,oy\n1,2\n");
    let mut iter = RowIterator::open(&descriptor).unwrap();
    assert!(iter.next().is_some());
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}

#[test]
fn test_parse_coordinate_dot() {
    assert_eq!(parse_coordinate("2.35", false), Some(2.35));
    assert_eq!(parse_coordinate(" -48.85 ", false), Some(-48.85));
    assert_eq!(parse_coordinate("12", false), Some(12.0));
}

#[test]
fn test_parse_coordinate_comma() {
    assert_eq!(parse_coordinate("2,35", true), Some(2.35));
    assert_eq!(parse_coordinate("-48,85", true), Some(-48.85));
}

#[test]
fn test_parse_coordinate_rejects_garbage() {
    assert_eq!(parse_coordinate("", false), None);
    assert_eq!(parse_coordinate("north", false), None);
    assert_eq!(parse_coordinate("NaN", false), None);
    assert_eq!(parse_coordinate("inf", false), None);
    // Comma value without the decimal-comma convention
    assert_eq!(parse_coordinate("2,35", false), None);
}
