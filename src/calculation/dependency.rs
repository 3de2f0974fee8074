//! Dependency resolution between structure entries.
//!
//! An entry depends on another when it is a percentage of it or when its
//! formula references it. Entries are ordered so every dependency is computed
//! before its dependents; a cycle is reported as
//! [`EngineError::CircularDependency`] naming the component that closes it.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::models::{ComponentId, SalaryStructureEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Orders entries so that dependencies precede dependents.
///
/// Ties are broken by input order. References to components that have no entry
/// add no edge; they resolve to a recorded default when evaluated.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::resolve_order;
/// use payroll_engine::models::{CalculationRule, SalaryStructureEntry};
/// use rust_decimal::Decimal;
///
/// let entries = vec![
///     SalaryStructureEntry {
///         employee_id: "emp_001".to_string(),
///         component_id: 2,
///         rule: CalculationRule::Percentage { percent: Decimal::from(10), based_on: 1 },
///     },
///     SalaryStructureEntry {
///         employee_id: "emp_001".to_string(),
///         component_id: 1,
///         rule: CalculationRule::Fixed { amount: Decimal::from(3100) },
///     },
/// ];
/// assert_eq!(resolve_order(&entries).unwrap(), vec![1, 2]);
/// ```
pub fn resolve_order(entries: &[SalaryStructureEntry]) -> EngineResult<Vec<ComponentId>> {
    let mut index: HashMap<ComponentId, &SalaryStructureEntry> = HashMap::new();
    for entry in entries {
        index.entry(entry.component_id).or_insert(entry);
    }

    let mut marks: HashMap<ComponentId, Mark> = HashMap::with_capacity(index.len());
    let mut order = Vec::with_capacity(index.len());

    for entry in entries {
        visit(entry.component_id, &index, &mut marks, &mut order)?;
    }

    Ok(order)
}

fn visit(
    id: ComponentId,
    index: &HashMap<ComponentId, &SalaryStructureEntry>,
    marks: &mut HashMap<ComponentId, Mark>,
    order: &mut Vec<ComponentId>,
) -> EngineResult<()> {
    match marks.get(&id) {
        Some(Mark::Visited) => return Ok(()),
        Some(Mark::Visiting) => return Err(EngineError::CircularDependency { component_id: id }),
        None => {}
    }

    let Some(entry) = index.get(&id) else {
        return Ok(());
    };

    marks.insert(id, Mark::Visiting);
    for dependency in entry.dependencies() {
        if index.contains_key(&dependency) {
            visit(dependency, index, marks, order)?;
        }
    }
    marks.insert(id, Mark::Visited);
    order.push(id);
    Ok(())
}
