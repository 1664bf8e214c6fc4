// ABOUTME: Stage-5 decomposition planning for composite predictions
// ABOUTME: Template mass splitting, component candidate gates, mass reconciliation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Decomposition Module (Stage 5).
//!
//! Splits a composite prediction across a template's weighted components.
//! Each component re-enters the orchestrator independently; this module owns
//! the pure planning and gating logic, the orchestrator owns the recursion
//! and its depth guard.

use crate::config::recipes::{RecipeComponent, RecipeTemplate};
use crate::models::ReferenceEntry;

/// Absolute slack allowed when reconciling component masses, in grams
pub const MASS_TOLERANCE_G: f64 = 1e-6;

/// One planned component resolution
#[derive(Debug, Clone)]
pub struct ComponentPlan<'a> {
    /// The template component
    pub component: &'a RecipeComponent,
    /// Mass assigned to this component, in grams
    pub mass_g: f64,
}

/// Split an input mass across a template's components by ratio
#[must_use]
pub fn plan_components(template: &RecipeTemplate, mass_g: f64) -> Vec<ComponentPlan<'_>> {
    template
        .components
        .iter()
        .map(|component| ComponentPlan {
            component,
            mass_g: mass_g * component.ratio,
        })
        .collect()
}

/// Whether reconstructed component masses sum back to the input mass
#[must_use]
pub fn masses_reconcile(input_g: f64, component_masses: &[f64]) -> bool {
    let sum: f64 = component_masses.iter().sum();
    // Relative slack scales with the portion; absolute floor covers tiny items
    let tolerance = MASS_TOLERANCE_G.max(input_g.abs() * 1e-9);
    (sum - input_g).abs() <= tolerance
}

/// Whether a candidate record is admissible for a component: none of the
/// reject patterns appear in its name, and its energy density sits inside
/// the component's bounds when bounds are set.
#[must_use]
pub fn component_admits(component: &RecipeComponent, candidate: &ReferenceEntry) -> bool {
    let name_lower = candidate.name.to_lowercase();
    if component
        .reject_patterns
        .iter()
        .any(|p| name_lower.contains(p.as_str()))
    {
        return false;
    }
    if let Some(bounds) = &component.energy_bounds {
        if !bounds.contains(candidate.per_100g.kcal) {
            return false;
        }
    }
    true
}

/// Search keys for a component, most specific first
#[must_use]
pub fn component_search_keys(component: &RecipeComponent) -> Vec<&str> {
    let mut keys: Vec<&str> = component
        .preferred_keys
        .iter()
        .map(String::as_str)
        .collect();
    keys.push(component.key.as_str());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnergyBand;
    use crate::models::{FoodForm, MacroProfile, ProvenanceTier};

    fn component(key: &str, ratio: f64) -> RecipeComponent {
        RecipeComponent {
            key: key.to_owned(),
            ratio,
            preferred_keys: Vec::new(),
            pinned_id: None,
            reject_patterns: vec!["soup".to_owned()],
            energy_bounds: Some(EnergyBand::new(100.0, 200.0)),
        }
    }

    fn candidate(name: &str, kcal: f64) -> ReferenceEntry {
        ReferenceEntry {
            id: 1,
            core_class: "test".to_owned(),
            name: name.to_owned(),
            tier: ProvenanceTier::SrLegacy,
            form: FoodForm::Cooked,
            method: None,
            per_100g: MacroProfile {
                kcal,
                ..MacroProfile::default()
            },
            brand: None,
        }
    }

    #[test]
    fn planned_masses_conserve_input() {
        let template = RecipeTemplate {
            name: "test".to_owned(),
            triggers: vec!["test".to_owned()],
            components: vec![component("a", 0.5), component("b", 0.3), component("c", 0.2)],
        };
        let plans = plan_components(&template, 340.0);
        let masses: Vec<f64> = plans.iter().map(|p| p.mass_g).collect();
        assert!(masses_reconcile(340.0, &masses));
    }

    #[test]
    fn reconciliation_rejects_drift() {
        assert!(!masses_reconcile(100.0, &[50.0, 49.0]));
        assert!(masses_reconcile(100.0, &[50.0, 50.0]));
    }

    #[test]
    fn reject_patterns_and_bounds_gate_candidates() {
        let c = component("bean_black", 0.2);
        assert!(component_admits(&c, &candidate("Black beans, cooked", 140.0)));
        assert!(!component_admits(&c, &candidate("Black bean soup", 140.0)));
        assert!(!component_admits(&c, &candidate("Black beans, cooked", 260.0)));
    }
}
