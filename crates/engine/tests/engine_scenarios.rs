//! End-to-end scenarios against the public API.

use lattice_engine::cell::{CellValue, ErrorKind};
use lattice_engine::error::SheetError;
use lattice_engine::position::{Position, Size};
use lattice_engine::sheet::Sheet;

fn pos(text: &str) -> Position {
    let pos = Position::parse(text);
    assert!(pos.is_valid(), "bad test position {:?}", text);
    pos
}

fn set(sheet: &mut Sheet, at: &str, text: &str) {
    sheet.set_cell(pos(at), text).unwrap();
}

fn value(sheet: &Sheet, at: &str) -> CellValue {
    sheet.value(pos(at)).unwrap()
}

#[test]
fn simple_arithmetic() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=1+2*3");

    assert_eq!(value(&sheet, "A1"), CellValue::Number(7.0));
    let cell = sheet.get_cell(pos("A1")).unwrap().unwrap();
    assert_eq!(cell.text(), "=1+2*3");
    assert!(cell.referenced_cells().is_empty());
}

#[test]
fn reference_chain_recomputes_after_upstream_change() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "10");
    set(&mut sheet, "A2", "=A1+5");
    set(&mut sheet, "A3", "=A2*2");
    assert_eq!(value(&sheet, "A3"), CellValue::Number(30.0));

    set(&mut sheet, "A1", "20");
    assert_eq!(value(&sheet, "A3"), CellValue::Number(50.0));
    assert_eq!(value(&sheet, "A2"), CellValue::Number(25.0));
}

#[test]
fn cycle_rejected_without_side_effects() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=B1");
    set(&mut sheet, "B1", "=C1");

    let before_a1 = sheet.text(pos("A1")).unwrap();
    let before_b1 = sheet.text(pos("B1")).unwrap();

    let err = sheet.set_cell(pos("C1"), "=A1").unwrap_err();
    assert!(matches!(err, SheetError::Circular(_)));

    assert!(sheet.get_cell(pos("C1")).unwrap().is_none());
    assert_eq!(sheet.text(pos("A1")).unwrap(), before_a1);
    assert_eq!(sheet.text(pos("B1")).unwrap(), before_b1);
}

#[test]
fn text_coercion_and_escape() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "3.14");
    set(&mut sheet, "A2", "'hello");
    set(&mut sheet, "B1", "=A1+1");
    set(&mut sheet, "B2", "=A2+1");

    assert_eq!(value(&sheet, "A2"), CellValue::Text("hello".to_string()));
    // 3.14 + 1.0 lands one ulp off the 4.14 literal; compare computed.
    assert_eq!(value(&sheet, "B1"), CellValue::Number(3.14 + 1.0));
    assert_eq!(value(&sheet, "B2"), CellValue::Error(ErrorKind::Value));
}

#[test]
fn division_by_zero_and_out_of_bounds_reference() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "=1/0");
    assert_eq!(value(&sheet, "A1"), CellValue::Error(ErrorKind::Div0));

    // ZZ99999 is outside the sheet bounds: rejected when the formula is
    // set, and the sheet stays as it was.
    let err = sheet.set_cell(pos("A2"), "=ZZ99999").unwrap_err();
    assert!(matches!(err, SheetError::Formula(_)));
    assert!(sheet.get_cell(pos("A2")).unwrap().is_none());
    assert_eq!(sheet.printable_size(), Size { rows: 1, cols: 1 });
}

#[test]
fn printable_size_and_text_rendering() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "B2", "hi");

    assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });

    let mut out = Vec::new();
    sheet.print_texts(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "\t\n\thi\n");
}

#[test]
fn resetting_current_text_is_idempotent() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "41");
    set(&mut sheet, "B1", "=A1+1");
    assert_eq!(value(&sheet, "B1"), CellValue::Number(42.0));

    for at in ["A1", "B1"] {
        let current = sheet.text(pos(at)).unwrap();
        sheet.set_cell(pos(at), &current).unwrap();
    }

    // No memo was disturbed: the downstream cell still answers from
    // cache.
    assert!(sheet
        .get_cell(pos("B1"))
        .unwrap()
        .unwrap()
        .has_cached_value());
    assert_eq!(value(&sheet, "B1"), CellValue::Number(42.0));
}

#[test]
fn clear_makes_cell_absent_and_size_never_grows() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "C3", "x");
    set(&mut sheet, "A1", "y");
    let before = sheet.printable_size();

    sheet.clear_cell(pos("C3")).unwrap();
    assert!(sheet.get_cell(pos("C3")).unwrap().is_none());

    let after = sheet.printable_size();
    assert!(after.rows <= before.rows && after.cols <= before.cols);
    assert_eq!(after, Size { rows: 1, cols: 1 });
}

#[test]
fn no_cycles_survive_any_successful_mutation() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "1");
    set(&mut sheet, "B1", "=A1");
    set(&mut sheet, "C1", "=B1+A1");

    // Every attempt to close a loop is rejected...
    assert!(sheet.set_cell(pos("A1"), "=C1").is_err());
    assert!(sheet.set_cell(pos("A1"), "=B1").is_err());
    assert!(sheet.set_cell(pos("B1"), "=B1").is_err());

    // ...and the surviving graph still evaluates.
    set(&mut sheet, "A1", "2");
    assert_eq!(value(&sheet, "C1"), CellValue::Number(4.0));
}

#[test]
fn referenced_cells_sorted_and_deduplicated() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "D4", "=B2+A1+B2+C3+A1");

    let cell = sheet.get_cell(pos("D4")).unwrap().unwrap();
    let refs = cell.referenced_cells();
    assert_eq!(refs, &[pos("A1"), pos("B2"), pos("C3")]);
    let mut sorted = refs.to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(refs, &sorted[..]);
}

#[test]
fn position_format_parse_roundtrip() {
    for (row, col) in [(0, 0), (0, 25), (0, 26), (8, 701), (9998, 702), (16383, 16383)] {
        let p = Position::new(row, col);
        assert_eq!(Position::parse(&p.to_string()), p);
    }
}

#[test]
fn formula_text_roundtrips_through_set() {
    let mut sheet = Sheet::new();
    for (input, canonical) in [
        ("=1+2*3", "=1+2*3"),
        ("= (1+2) * 3", "=(1+2)*3"),
        ("=((A1))+0", "=A1+0"),
        ("=-(B2-1)", "=-(B2-1)"),
    ] {
        set(&mut sheet, "A9", input);
        assert_eq!(sheet.text(pos("A9")).unwrap(), canonical);

        // Setting the canonical text back is accepted and stable.
        set(&mut sheet, "A9", canonical);
        assert_eq!(sheet.text(pos("A9")).unwrap(), canonical);
    }
}

#[test]
fn cached_error_cleared_by_upstream_fix() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "oops");
    set(&mut sheet, "B1", "=A1*2");
    assert_eq!(value(&sheet, "B1"), CellValue::Error(ErrorKind::Value));
    assert!(sheet
        .get_cell(pos("B1"))
        .unwrap()
        .unwrap()
        .has_cached_value());

    set(&mut sheet, "A1", "21");
    assert!(!sheet
        .get_cell(pos("B1"))
        .unwrap()
        .unwrap()
        .has_cached_value());
    assert_eq!(value(&sheet, "B1"), CellValue::Number(42.0));
}

#[test]
fn clearing_a_referenced_cell_reads_as_zero() {
    let mut sheet = Sheet::new();
    set(&mut sheet, "A1", "6");
    set(&mut sheet, "B1", "=A1*7");
    assert_eq!(value(&sheet, "B1"), CellValue::Number(42.0));

    sheet.clear_cell(pos("A1")).unwrap();
    assert_eq!(value(&sheet, "B1"), CellValue::Number(0.0));
}
