//! Example: register a plugin function and watch recalculation passes

use cellflow::prelude::*;

fn main() -> Result<()> {
    let mut engine = Engine::new();

    engine.on_cells_changed(|changes| {
        let cells: Vec<String> = changes.cells().iter().map(ToString::to_string).collect();
        println!("changed: {}", cells.join(", "));
    });

    // Add header row and data rows in one pass
    engine.batch(|b| {
        b.set("A1", "Principal")?;
        b.set("B1", "1000")?;
        b.set("A2", "Rate")?;
        b.set("B2", "0.05")?;
        b.set("A3", "Interest")?;
        b.set("B3", "=INTEREST(B1,B2)")?;
        Ok(())
    })?;

    // Not registered yet
    println!("B3 before registration: {}", engine.value("B3")?);

    engine.register_function(
        FunctionDef::eager("INTEREST", 2, Some(2), |args, _ctx| {
            let principal = args[0].as_value().cloned().unwrap_or_default();
            let rate = args[1].as_value().cloned().unwrap_or_default();
            match (principal, rate) {
                (CellValue::Number(p), CellValue::Number(r)) => Ok(CellValue::number(p * r)),
                _ => Ok(CellValue::Error(CellError::Value)),
            }
        })
        .with_params(&[ArgClass::Number]),
    );
    println!("B3 after registration: {}", engine.value("B3")?);

    engine.set("B1", "2500")?;
    println!("B3 after edit: {}", engine.value("B3")?);

    let stats = engine.last_pass();
    println!(
        "last pass: {} touched, {} evaluated, {} changed",
        stats.touched.len(),
        stats.evaluated,
        stats.changed
    );

    Ok(())
}
