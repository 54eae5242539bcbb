//! Tests for incremental recalculation through the engine API

use cellflow::prelude::*;
use cellflow::{ParseErrorKind, Precedent, RangeKey};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn key(engine: &Engine, address: &str) -> CellKey {
    engine.cell_key(address).unwrap()
}

fn keys(engine: &Engine, addresses: &[&str]) -> Vec<CellKey> {
    addresses.iter().map(|a| key(engine, a)).collect()
}

fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

fn err(e: CellError) -> CellValue {
    CellValue::Error(e)
}

/// Engine with a recorder of every change notification
fn recording_engine() -> (Engine, Rc<RefCell<Vec<Vec<CellKey>>>>) {
    let mut engine = Engine::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.on_cells_changed(move |changes| sink.borrow_mut().push(changes.cells()));
    (engine, log)
}

// === Basic behavior ===

#[test]
fn test_simple_sum() {
    let mut engine = Engine::new();
    engine.set("A1", "2").unwrap();
    engine.set("A2", "3").unwrap();
    engine.set("A3", "=A1+A2").unwrap();

    assert_eq!(engine.value("A3").unwrap(), num(5.0));
    assert!(engine.audit().is_empty());
}

#[test]
fn test_self_reference_is_circular() {
    let mut engine = Engine::new();
    engine.set("A1", "=A1").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Circular));
}

#[test]
fn test_division_by_zero() {
    let mut engine = Engine::new();
    engine.set("A1", "10").unwrap();
    engine.set("B1", "=A1/0").unwrap();
    engine.set("C1", "=B1+1").unwrap();

    assert_eq!(engine.value("B1").unwrap(), err(CellError::Div0));
    assert_eq!(engine.value("C1").unwrap(), err(CellError::Div0));
}

#[test]
fn test_plugin_sum_ignores_text_in_ranges() {
    let mut engine = Engine::new();
    let sum = engine.functions().get("SUM").unwrap().renamed("SOMA");
    engine.register_function(sum);

    engine.set("B1", "1").unwrap();
    engine.set("B2", "2").unwrap();
    engine.set("B3", "x").unwrap();
    engine.set("A1", "=SOMA(B1:B3)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), num(3.0));

    // Direct text arguments are still coerced, and fail when not numeric
    engine.set("A2", "=SOMA(B1, \"x\")").unwrap();
    assert_eq!(engine.value("A2").unwrap(), err(CellError::Value));
}

#[test]
fn test_strict_plugin_can_reject_text_in_ranges() {
    let mut engine = Engine::new();
    engine.register_function(
        FunctionDef::eager("STRICTSUM", 1, None, |args, _ctx| {
            let mut total = 0.0;
            for value in args.iter().flat_map(FunctionArg::values) {
                match value {
                    CellValue::Number(n) => total += n,
                    CellValue::Empty => {}
                    CellValue::Error(e) => return Ok(CellValue::Error(*e)),
                    _ => return Ok(CellValue::Error(CellError::Value)),
                }
            }
            Ok(CellValue::number(total))
        })
        .with_params(&[ArgClass::NumberOrRange]),
    );

    engine.set("B1", "1").unwrap();
    engine.set("B2", "2").unwrap();
    engine.set("B3", "x").unwrap();
    engine.set("A1", "=STRICTSUM(B1:B3)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Value));
}

#[test]
fn test_edit_reports_changed_set() {
    let mut engine = Engine::new();
    engine.set("A1", "2").unwrap();
    engine.set("A2", "=A1*2").unwrap();
    engine.set("A3", "=A2+1").unwrap();

    let changed = engine.set("A1", "5").unwrap();

    assert_eq!(changed.cells(), keys(&engine, &["A1", "A2", "A3"]));
    assert_eq!(engine.value("A1").unwrap(), num(5.0));
    assert_eq!(engine.value("A2").unwrap(), num(10.0));
    assert_eq!(engine.value("A3").unwrap(), num(11.0));
    assert_eq!(changed.value(key(&engine, "A3")), Some(&num(11.0)));
}

// === Incremental recalculation ===

#[test]
fn test_pass_touches_only_dependents() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("A2", "=A1+1").unwrap();
    engine.set("A3", "=A2+1").unwrap();
    engine.set("B1", "10").unwrap();
    engine.set("B2", "=B1*2").unwrap();

    let before = engine.get_cell_value(key(&engine, "B2"));
    engine.set("A1", "7").unwrap();

    assert_eq!(engine.last_pass().touched, keys(&engine, &["A1", "A2", "A3"]));
    assert_eq!(engine.last_pass().evaluated, 2);
    assert_eq!(engine.get_cell_value(key(&engine, "B2")), before);
}

#[test]
fn test_range_dependents_are_recalculated() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("A2", "2").unwrap();
    engine.set("B1", "=SUM(A1:A10)").unwrap();
    assert_eq!(engine.value("B1").unwrap(), num(3.0));

    // A cell that was never written before, inside the range
    let changed = engine.set("A10", "4").unwrap();

    assert_eq!(engine.value("B1").unwrap(), num(7.0));
    // Sorted by sheet, row, column
    assert_eq!(changed.cells(), keys(&engine, &["B1", "A10"]));
}

#[test]
fn test_diamond_evaluates_each_cell_once() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("B1", "=A1+1").unwrap();
    engine.set("C1", "=A1*10").unwrap();
    engine.set("D1", "=B1+C1").unwrap();

    engine.set("A1", "2").unwrap();

    assert_eq!(engine.value("D1").unwrap(), num(23.0));
    assert_eq!(engine.last_pass().evaluated, 3);
    let touched = &engine.last_pass().touched;
    assert_eq!(touched.first(), Some(&key(&engine, "A1")));
    assert_eq!(touched.last(), Some(&key(&engine, "D1")));
}

#[test]
fn test_recalculate_is_idempotent() {
    let mut engine = Engine::new();
    engine.set("A1", "3").unwrap();
    engine.set("A2", "=A1^2").unwrap();
    engine.set("A3", "=A2&\" units\"").unwrap();

    assert!(engine.recalculate_all().is_empty());
    assert!(engine.recalculate(&keys(&engine, &["A1"])).is_empty());
    assert_eq!(engine.last_pass().touched.len(), 3);
    assert_eq!(engine.value("A3").unwrap(), CellValue::text("9 units"));
}

#[test]
fn test_same_value_is_not_a_change() {
    let mut engine = Engine::new();
    engine.set("A1", "4").unwrap();
    engine.set("A2", "=A1>0").unwrap();

    let changed = engine.set("A1", "5").unwrap();

    assert_eq!(changed.cells(), keys(&engine, &["A1"]));
    assert_eq!(engine.last_pass().evaluated, 1);
}

#[test]
fn test_clearing_a_cell() {
    let mut engine = Engine::new();
    engine.set("A1", "4").unwrap();
    engine.set("A2", "=A1*2").unwrap();

    engine.set("A1", "").unwrap();

    assert_eq!(engine.value("A1").unwrap(), CellValue::Empty);
    assert_eq!(engine.value("A2").unwrap(), num(0.0));
}

#[test]
fn test_replacing_formula_drops_old_edges() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("B1", "2").unwrap();
    engine.set("C1", "=A1*100").unwrap();
    engine.set("C1", "=B1*100").unwrap();

    assert!(engine.dependents(key(&engine, "A1")).is_empty());
    assert_eq!(
        engine.precedents(key(&engine, "C1")),
        &[Precedent::Cell(key(&engine, "B1"))]
    );

    let changed = engine.set("A1", "9").unwrap();
    assert_eq!(changed.cells(), keys(&engine, &["A1"]));
    assert_eq!(engine.value("C1").unwrap(), num(200.0));
}

#[test]
fn test_range_edges_are_not_expanded() {
    let mut engine = Engine::new();
    engine.set("B1", "=SUM(A1:A1000)").unwrap();

    assert_eq!(
        engine.precedents(key(&engine, "B1")),
        &[Precedent::Range(RangeKey::new(0, 0, 0, 999, 0))]
    );
    assert_eq!(
        engine.dependents(key(&engine, "A500")),
        keys(&engine, &["B1"])
    );
}

// === Cycles ===

#[test]
fn test_mutual_reference_is_contained() {
    let mut engine = Engine::new();
    engine.set("C1", "1").unwrap();
    engine.set("C2", "=C1+1").unwrap();
    engine.set("A1", "=B1").unwrap();
    engine.set("B1", "=A1").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Circular));
    assert_eq!(engine.value("B1").unwrap(), err(CellError::Circular));

    engine.set("C1", "5").unwrap();
    assert_eq!(engine.value("C2").unwrap(), num(6.0));
    assert!(engine.audit().is_empty());
}

#[test]
fn test_range_self_reference_is_circular() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("A3", "=SUM(A1:A5)").unwrap();

    assert_eq!(engine.value("A3").unwrap(), err(CellError::Circular));
}

#[test]
fn test_reader_of_cycle_sees_circular() {
    let mut engine = Engine::new();
    engine.set("C1", "=A1*2").unwrap();
    engine.set("A1", "=B1+1").unwrap();
    assert_eq!(engine.value("C1").unwrap(), num(2.0));

    engine.set("B1", "=A1+1").unwrap();

    assert_eq!(engine.value("C1").unwrap(), err(CellError::Circular));
    assert_eq!(engine.last_pass().circular, 2);
    assert_eq!(engine.last_pass().touched.len(), 3);
}

#[test]
fn test_breaking_a_cycle_heals_members() {
    let mut engine = Engine::new();
    engine.set("A1", "=B1+1").unwrap();
    engine.set("B1", "=C1+1").unwrap();
    engine.set("C1", "=A1+1").unwrap();
    assert_eq!(engine.value("B1").unwrap(), err(CellError::Circular));

    let changed = engine.set("C1", "10").unwrap();

    assert_eq!(engine.value("B1").unwrap(), num(11.0));
    assert_eq!(engine.value("A1").unwrap(), num(12.0));
    assert_eq!(changed.len(), 3);
    assert!(engine.audit().is_empty());
}

// === Parse errors ===

#[test]
fn test_parse_error_leaves_no_edges() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("A2", "=A1*2").unwrap();
    engine.set("A2", "=A1*").unwrap();

    let a2 = key(&engine, "A2");
    assert_eq!(engine.get_cell_value(a2), err(CellError::Error));
    assert!(engine.precedents(a2).is_empty());
    let parse_error = engine.cell(a2).and_then(|c| c.parse_error()).unwrap();
    assert_eq!(parse_error.kind, ParseErrorKind::UnexpectedEnd);

    // Terminal until the text is edited
    let changed = engine.set("A1", "2").unwrap();
    assert_eq!(changed.cells(), keys(&engine, &["A1"]));
    assert_eq!(engine.get_cell_value(a2), err(CellError::Error));

    engine.set("A2", "=A1*3").unwrap();
    assert_eq!(engine.get_cell_value(a2), num(6.0));
}

#[test]
fn test_unknown_name_is_name_error() {
    let mut engine = Engine::new();
    engine.set("A1", "=revenue+1").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Name));
}

#[test]
fn test_literal_input_is_not_parsed() {
    let mut engine = Engine::new();
    engine.set("A1", "SUM(").unwrap();
    engine.set("A2", " 12.5 ").unwrap();
    engine.set("A3", "true").unwrap();

    assert_eq!(engine.value("A1").unwrap(), CellValue::text("SUM("));
    assert_eq!(engine.value("A2").unwrap(), num(12.5));
    assert_eq!(engine.value("A3").unwrap(), CellValue::Boolean(true));
}

// === Evaluation semantics through the engine ===

#[test]
fn test_mixed_type_comparison_and_concat() {
    let mut engine = Engine::new();
    engine.set("A1", "apple").unwrap();
    engine.set("A2", "5").unwrap();
    engine.set("B1", "=A1>A2").unwrap();
    engine.set("B2", "=A2&\"-\"&A1&TRUE").unwrap();
    engine.set("B3", "=A1+1").unwrap();
    engine.set("B4", "=\"3\"*A2").unwrap();

    assert_eq!(engine.value("B1").unwrap(), CellValue::Boolean(true));
    assert_eq!(engine.value("B2").unwrap(), CellValue::text("5-appleTRUE"));
    assert_eq!(engine.value("B3").unwrap(), err(CellError::Value));
    assert_eq!(engine.value("B4").unwrap(), num(15.0));
}

#[test]
fn test_range_outside_function_is_value_error() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("B1", "=A1:A2").unwrap();
    engine.set("B2", "=ABS(A1:A2)").unwrap();
    engine.set("B3", "=A1:A2+1").unwrap();

    assert_eq!(engine.value("B1").unwrap(), err(CellError::Value));
    assert_eq!(engine.value("B2").unwrap(), err(CellError::Value));
    assert_eq!(engine.value("B3").unwrap(), err(CellError::Value));
}

#[test]
fn test_short_circuit_and_absorbing_functions() {
    let mut engine = Engine::new();
    engine.set("A1", "0").unwrap();
    engine.set("B1", "=IF(A1=0, \"none\", 10/A1)").unwrap();
    engine.set("B2", "=IFERROR(10/A1, -1)").unwrap();
    engine.set("B3", "=ISERROR(10/A1)").unwrap();
    engine.set("B4", "=NOT(ISERROR(10/A1))").unwrap();

    assert_eq!(engine.value("B1").unwrap(), CellValue::text("none"));
    assert_eq!(engine.value("B2").unwrap(), num(-1.0));
    assert_eq!(engine.value("B3").unwrap(), CellValue::Boolean(true));
    assert_eq!(engine.value("B4").unwrap(), CellValue::Boolean(false));

    engine.set("A1", "4").unwrap();
    assert_eq!(engine.value("B1").unwrap(), num(2.5));
    assert_eq!(engine.value("B2").unwrap(), num(2.5));
    assert_eq!(engine.value("B3").unwrap(), CellValue::Boolean(false));
}

#[test]
fn test_arity_and_unknown_function() {
    let mut engine = Engine::new();
    engine.set("A1", "=ABS(1, 2)").unwrap();
    engine.set("A2", "=NOPE(1)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Error));
    assert_eq!(engine.value("A2").unwrap(), err(CellError::Name));
}

#[test]
fn test_error_literal() {
    let mut engine = Engine::new();
    engine.set("A1", "=#REF").unwrap();
    engine.set("A2", "=ISERROR(#DIV0)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Ref));
    assert_eq!(engine.value("A2").unwrap(), CellValue::Boolean(true));
}

#[test]
fn test_non_finite_result_is_num_error() {
    let mut engine = Engine::new();
    engine.set("A1", "=10^400").unwrap();
    engine.set("A2", "=SQRT(-4)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Num));
    assert_eq!(engine.value("A2").unwrap(), err(CellError::Num));
}

// === Sheets ===

#[test]
fn test_cross_sheet_reference() {
    let mut engine = Engine::new();
    engine.add_sheet("Data").unwrap();
    engine.add_sheet("Q1 Sales").unwrap();
    engine.set("Data!A1", "100").unwrap();
    engine.set("'Q1 Sales'!B2", "25").unwrap();
    engine.set("A1", "=Data!A1+'Q1 Sales'!B2").unwrap();
    engine.set("A2", "=SUM(data!A1:A3)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), num(125.0));
    assert_eq!(engine.value("A2").unwrap(), num(100.0));

    engine.set("Data!A2", "5").unwrap();
    assert_eq!(engine.value("A2").unwrap(), num(105.0));
}

#[test]
fn test_unknown_sheet_resolves_when_added() {
    let (mut engine, log) = recording_engine();
    engine.set("A1", "=Later!B1*2").unwrap();
    assert_eq!(engine.value("A1").unwrap(), err(CellError::Ref));
    assert!(engine.precedents(key(&engine, "A1")).is_empty());

    let later = engine.add_sheet("Later").unwrap();
    assert_eq!(engine.value("A1").unwrap(), num(0.0));
    assert_eq!(log.borrow().last(), Some(&keys(&engine, &["A1"])));

    engine.set_cell_content(CellKey::new(later, 0, 1), "21").unwrap();
    assert_eq!(engine.value("A1").unwrap(), num(42.0));
}

#[test]
fn test_duplicate_sheet_is_rejected() {
    let mut engine = Engine::new();
    assert_eq!(
        engine.add_sheet("SHEET1"),
        Err(Error::DuplicateSheetName("SHEET1".into()))
    );
}

// === Notifications, batches and external values ===

#[test]
fn test_listener_called_once_per_pass() {
    let (mut engine, log) = recording_engine();
    engine.set("A1", "1").unwrap();
    engine.set("A2", "=A1+1").unwrap();
    log.borrow_mut().clear();

    engine.set("A1", "2").unwrap();
    engine.set("A1", "2").unwrap();

    let calls = log.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], keys(&engine, &["A1", "A2"]));
}

#[test]
fn test_batch_runs_one_pass() {
    let (mut engine, log) = recording_engine();

    let changed = engine
        .batch(|b| {
            b.set("A1", "2")?;
            b.set("A2", "3")?;
            b.set("A3", "=A1*A2")?;
            b.set("A1", "4")?;
            Ok(())
        })
        .unwrap();

    assert_eq!(log.borrow().len(), 1);
    assert_eq!(changed.cells(), keys(&engine, &["A1", "A2", "A3"]));
    assert_eq!(engine.value("A3").unwrap(), num(12.0));
}

#[test]
fn test_failed_batch_applies_nothing() {
    let (mut engine, log) = recording_engine();

    let result = engine.batch(|b| {
        b.set("A1", "2")?;
        b.set("Nowhere!A1", "3")?;
        Ok(())
    });

    assert_eq!(result, Err(Error::SheetNotFound("Nowhere".into())));
    assert_eq!(engine.value("A1").unwrap(), CellValue::Empty);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_external_value_reenters_recalculation() {
    let mut engine = Engine::new();
    engine.set("B1", "=A1*12").unwrap();

    let a1 = key(&engine, "A1");
    let changed = engine.set_external_value(a1, num(1.5)).unwrap();

    assert_eq!(engine.value("B1").unwrap(), num(18.0));
    assert_eq!(changed.len(), 2);
    assert!(!engine.cell(a1).unwrap().is_formula());
}

#[test]
fn test_snapshot_is_detached() {
    let mut engine = Engine::new();
    engine.set("A1", "1").unwrap();
    engine.set("A2", "=A1+1").unwrap();
    engine.set("A3", "").unwrap();

    let snapshot = engine.snapshot();
    engine.set("A1", "10").unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get(key(&engine, "A2")), num(2.0));
    assert_eq!(engine.value("A2").unwrap(), num(11.0));
}

// === Function registration ===

#[test]
fn test_late_registration_heals_name_errors() {
    let mut engine = Engine::new();
    engine.set("A1", "4").unwrap();
    engine.set("B1", "=double(A1)").unwrap();
    engine.set("C1", "=B1+1").unwrap();
    assert_eq!(engine.value("C1").unwrap(), err(CellError::Name));

    let changed = engine.register_function(
        FunctionDef::eager("DOUBLE", 1, Some(1), |args, _ctx| {
            match args[0].as_value() {
                Some(CellValue::Number(n)) => Ok(CellValue::number(n * 2.0)),
                _ => Ok(CellValue::Error(CellError::Value)),
            }
        })
        .with_params(&[ArgClass::Number]),
    );

    assert_eq!(changed.cells(), keys(&engine, &["B1", "C1"]));
    assert_eq!(engine.value("C1").unwrap(), num(9.0));
}

#[test]
fn test_reregistration_overwrites() {
    let mut engine = Engine::new();
    engine.set("A1", "=SUM(1, 2)").unwrap();

    engine.register_function(FunctionDef::eager("sum", 0, None, |_args, _ctx| {
        Ok(CellValue::text("replaced"))
    }));

    assert_eq!(engine.value("A1").unwrap(), CellValue::text("replaced"));
}

#[test]
fn test_lazy_plugin_evaluates_on_demand() {
    let mut engine = Engine::new();
    engine.register_function(
        FunctionDef::lazy("FIRSTOK", 1, None, |args| {
            for i in 0..args.len() {
                let value = args.value(i)?;
                if !value.is_error() {
                    return Ok(value);
                }
            }
            Ok(CellValue::Error(CellError::Value))
        })
        .absorbing_errors(),
    );
    engine.set("A1", "=FIRSTOK(1/0, #REF, 7, 1/0)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), num(7.0));
}

#[test]
fn test_range_argument_errors_propagate_to_plugins() {
    let mut engine = Engine::new();
    engine.register_function(
        FunctionDef::eager("CELLS", 1, Some(1), |args, _ctx| {
            Ok(CellValue::Number(args[0].values().len() as f64))
        })
        .with_params(&[ArgClass::AnyOrRange]),
    );
    engine.set("A1", "=1/0").unwrap();
    engine.set("B1", "=CELLS(A1:A2)").unwrap();
    engine.set("B2", "=CELLS(A1)").unwrap();
    engine.set("B3", "=CELLS(C1:C3)").unwrap();

    assert_eq!(engine.value("B1").unwrap(), err(CellError::Div0));
    assert_eq!(engine.value("B2").unwrap(), err(CellError::Div0));
    assert_eq!(engine.value("B3").unwrap(), num(3.0));

    engine.set("A1", "1").unwrap();
    assert_eq!(engine.value("B1").unwrap(), num(2.0));
}

// === Faults and limits ===

#[test]
fn test_panicking_function_is_contained() {
    let mut engine = Engine::new();
    engine.register_function(FunctionDef::eager("BOOM", 0, Some(0), |_args, _ctx| {
        panic!("plugin bug")
    }));
    engine.set("A1", "5").unwrap();
    engine.set("B1", "=BOOM()").unwrap();
    engine.set("B2", "=B1+1").unwrap();
    engine.set("B3", "=A1*2").unwrap();

    assert_eq!(engine.value("B1").unwrap(), err(CellError::Error));
    assert_eq!(engine.value("B2").unwrap(), err(CellError::Error));
    assert_eq!(engine.value("B3").unwrap(), num(10.0));
}

#[test]
fn test_failing_function_counts_as_fault() {
    let mut engine = Engine::new();
    engine.register_function(FunctionDef::eager("FAIL", 0, Some(0), |_args, ctx| {
        Err(FormulaError::function(ctx.name, "backend unavailable"))
    }));
    engine.set("A1", "=IFERROR(FAIL(), 0)").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Error));
    assert_eq!(engine.last_pass().faults, 1);
}

#[test]
fn test_depth_limit() {
    let options = EngineOptions {
        max_depth: 8,
        ..EngineOptions::default()
    };
    let mut engine = Engine::with_options(options).unwrap();
    engine.set("A1", &format!("={}1", "-".repeat(20))).unwrap();
    engine.set("A2", "=--1").unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Error));
    assert_eq!(engine.value("A2").unwrap(), num(1.0));
}

#[test]
fn test_long_operator_chain_is_rejected_then_replaced() {
    let mut engine = Engine::new();
    let a1 = key(&engine, "A1");
    engine.set("A1", &format!("={}1", "1+".repeat(30_000))).unwrap();

    assert_eq!(engine.value("A1").unwrap(), err(CellError::Error));
    let kind = engine.cell(a1).and_then(|cell| cell.parse_error()).map(|e| e.kind);
    assert_eq!(kind, Some(ParseErrorKind::TooDeep));

    engine.set("A1", "2").unwrap();
    engine.set("A2", &format!("={}A1", "A1+".repeat(99))).unwrap();
    assert_eq!(engine.value("A2").unwrap(), num(200.0));
}

#[test]
fn test_range_size_limit() {
    let options = EngineOptions {
        max_range_cells: 100,
        ..EngineOptions::default()
    };
    let mut engine = Engine::with_options(options).unwrap();
    engine.set("B1", "=SUM(A1:A101)").unwrap();
    engine.set("B2", "=SUM(A1:A100)").unwrap();

    assert_eq!(engine.value("B1").unwrap(), err(CellError::Error));
    assert_eq!(engine.value("B2").unwrap(), num(0.0));
}

#[test]
fn test_long_chain() {
    let mut engine = Engine::new();
    engine
        .batch(|b| {
            b.set("A1", "1")?;
            for row in 2..=2000 {
                b.set(&format!("A{}", row), &format!("=A{}+1", row - 1))?;
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(engine.value("A2000").unwrap(), num(2000.0));

    engine.set("A1", "0").unwrap();
    assert_eq!(engine.value("A2000").unwrap(), num(1999.0));
    assert_eq!(engine.last_pass().changed, 2000);
}
