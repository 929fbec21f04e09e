//! Packaging invariants checked at runtime.
//!
//! Each check that holds is recorded under its component, so tests can demand
//! that a code path really went through the check (see [`contract_test`]).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use lazy_static::lazy_static;
use log::error;

pub const UPLOAD_IS_UNSIGNED: &str = "Upload packages never carry signing flags";
pub const SIDELOAD_IS_NOT_STORE: &str = "Sideload packages never carry store-upload flags";
pub const SELECTION_SKIPS_DEPENDENCIES: &str =
    "Selected artifact never lies in a dependencies subtree";

lazy_static! {
    /// Component -> invariants that held at least once in this process.
    static ref HELD: Mutex<BTreeMap<String, BTreeSet<&'static str>>> =
        Mutex::new(BTreeMap::new());
}

/// Checks one packaging invariant.
///
/// A violation is logged, then panics in debug and test builds. Release builds
/// keep going so a CI step still reports whatever it did produce.
pub fn assert_invariant(condition: bool, invariant: &'static str, component: &str) {
    if !condition {
        let msg = format!("INVARIANT VIOLATION [{}]: {}", component, invariant);
        error!("{}", msg);
        if cfg!(debug_assertions) || cfg!(test) {
            panic!("{}", msg);
        }
        return;
    }
    if let Ok(mut held) = HELD.lock() {
        held.entry(component.to_string()).or_default().insert(invariant);
    }
}

/// Panics unless every `required` invariant held at least once under `component`.
#[cfg(test)]
pub fn contract_test(component: &str, required: &[&str]) {
    let missing: Vec<&str> = {
        let held = HELD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let checked = held.get(component);
        required
            .iter()
            .copied()
            .filter(|inv| !checked.is_some_and(|set| set.contains(*inv)))
            .collect()
    };

    assert!(
        missing.is_empty(),
        "[{}] invariants never checked: {:#?}",
        component,
        missing
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_invariants_are_recorded_per_component() {
        assert_invariant(true, UPLOAD_IS_UNSIGNED, "Registry");
        contract_test("Registry", &[UPLOAD_IS_UNSIGNED]);
    }

    #[test]
    #[should_panic(expected = "never checked")]
    fn invariant_from_another_component_does_not_count() {
        assert_invariant(true, SIDELOAD_IS_NOT_STORE, "Elsewhere");
        contract_test("Nowhere", &[SIDELOAD_IS_NOT_STORE]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [Registry]")]
    fn violation_panics_under_test() {
        assert_invariant(false, SELECTION_SKIPS_DEPENDENCIES, "Registry");
    }
}
