//! Property tests: incremental recalculation agrees with evaluating from scratch

use cellflow::prelude::*;
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const ROWS: u32 = 8;

/// Content written into column A
#[derive(Debug, Clone)]
enum Content {
    Number(i32),
    Label,
    Clear,
    Add(u32, u32),
    Scale(u32),
    Sum(u32, u32),
    Choose(u32, u32),
    Divide(u32, u32),
}

impl Content {
    fn text(&self) -> String {
        match self {
            Content::Number(n) => n.to_string(),
            Content::Label => "label".to_string(),
            Content::Clear => String::new(),
            Content::Add(a, b) => format!("=A{}+A{}", a, b),
            Content::Scale(a) => format!("=A{}*2", a),
            Content::Sum(a, b) => format!("=SUM(A{}:A{})", a, b),
            Content::Choose(a, b) => format!("=IF(A{}>0,A{},-A{})", a, b, a),
            Content::Divide(a, b) => format!("=A{}/A{}", a, b),
        }
    }

    /// Same shape, with references pointed at rows above `row`
    fn acyclic(&self, row: u32) -> Content {
        if row == 1 {
            return match self {
                Content::Add(a, _) | Content::Scale(a) | Content::Sum(a, _) => {
                    Content::Number(*a as i32)
                }
                Content::Choose(a, _) | Content::Divide(a, _) => Content::Number(-(*a as i32)),
                other => other.clone(),
            };
        }
        let up = |r: u32| (r - 1) % (row - 1) + 1;
        match self {
            Content::Add(a, b) => Content::Add(up(*a), up(*b)),
            Content::Scale(a) => Content::Scale(up(*a)),
            Content::Sum(a, b) => Content::Sum(up(*a), up(*b)),
            Content::Choose(a, b) => Content::Choose(up(*a), up(*b)),
            Content::Divide(a, b) => Content::Divide(up(*a), up(*b)),
            other => other.clone(),
        }
    }
}

fn any_content() -> impl Strategy<Value = Content> {
    let row = 1..=ROWS;
    prop_oneof![
        (-20i32..20).prop_map(Content::Number),
        Just(Content::Label),
        Just(Content::Clear),
        (row.clone(), row.clone()).prop_map(|(a, b)| Content::Add(a, b)),
        row.clone().prop_map(Content::Scale),
        (row.clone(), row.clone()).prop_map(|(a, b)| Content::Sum(a, b)),
        (row.clone(), row.clone()).prop_map(|(a, b)| Content::Choose(a, b)),
        (row.clone(), row).prop_map(|(a, b)| Content::Divide(a, b)),
    ]
}

fn address(row: u32) -> String {
    format!("A{}", row)
}

/// The seed plus everything that transitively reads it
fn reachable(engine: &Engine, seed: CellKey) -> BTreeSet<CellKey> {
    let mut seen = BTreeSet::from([seed]);
    let mut queue = VecDeque::from([seed]);
    while let Some(cell) = queue.pop_front() {
        for dependent in engine.dependents(cell) {
            if seen.insert(dependent) {
                queue.push_back(dependent);
            }
        }
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_incremental_matches_fresh_engine(edits in vec((1..=ROWS, any_content()), 1..40)) {
        let mut engine = Engine::new();
        let mut contents = BTreeMap::new();

        for (row, content) in &edits {
            engine.set(&address(*row), &content.text()).unwrap();
            contents.insert(*row, content.text());
            prop_assert!(engine.audit().is_empty());
        }

        let mut fresh = Engine::new();
        fresh
            .batch(|b| {
                for (row, text) in &contents {
                    b.set(&address(*row), text)?;
                }
                Ok(())
            })
            .unwrap();

        for row in 1..=ROWS {
            prop_assert_eq!(
                engine.value(&address(row)).unwrap(),
                fresh.value(&address(row)).unwrap()
            );
        }
        prop_assert!(engine.recalculate_all().is_empty());
    }

    #[test]
    fn prop_pass_visits_dependents_in_order(
        edits in vec((1..=ROWS, any_content()), 1..30),
        seed_row in 1..=ROWS,
    ) {
        let mut engine = Engine::new();
        for (row, content) in &edits {
            engine.set(&address(*row), &content.acyclic(*row).text()).unwrap();
        }

        let seed = engine.cell_key(&address(seed_row)).unwrap();
        let before = engine.snapshot();
        engine.recalculate(&[seed]);
        let touched = engine.last_pass().touched.clone();

        // Precedents inside the pass come strictly before their readers
        for (i, cell) in touched.iter().enumerate() {
            for precedent in engine.precedents(*cell) {
                prop_assert!(!touched[i..].iter().any(|later| precedent.covers(later)));
            }
        }

        // Exactly the seed and its dependents are visited
        let visited: BTreeSet<CellKey> = touched.iter().copied().collect();
        prop_assert_eq!(visited.len(), touched.len());
        prop_assert_eq!(&visited, &reachable(&engine, seed));

        // Nothing changed since the last edit already settled every value
        for (cell, value) in before.iter() {
            prop_assert_eq!(&engine.get_cell_value(cell), value);
        }
        prop_assert_eq!(engine.last_pass().circular, 0);
    }
}
