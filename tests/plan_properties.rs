// tests/plan_properties.rs

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use orchix::dag::DependencyGraph;
use orchix::manifest::Manifest;
use orchix_test_utils::{ComponentBuilder, ManifestBuilder};

// Acyclic by construction: component N may only depend on components 0..N-1.
fn dag_manifest_strategy(max_components: usize) -> impl Strategy<Value = Manifest> {
    (1..=max_components).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..count), count)
            .prop_map(move |raw_deps| {
                let mut builder = ManifestBuilder::new("prop");
                for (i, potential) in raw_deps.into_iter().enumerate() {
                    let mut component = ComponentBuilder::new(&format!("c{i:02}"));
                    if i > 0 {
                        let deps: HashSet<usize> = potential.into_iter().map(|d| d % i).collect();
                        for dep in deps {
                            component = component.depends_on(&format!("c{dep:02}"));
                        }
                    }
                    builder = builder.component(component.build());
                }
                builder.build_unchecked()
            })
    })
}

proptest! {
    #[test]
    fn every_dependency_runs_in_an_earlier_stage(manifest in dag_manifest_strategy(12)) {
        let graph = DependencyGraph::from_manifest(&manifest).unwrap();
        let plan = graph.execution_order().unwrap();

        let mut stage_of = HashMap::new();
        for (idx, stage) in plan.stages().iter().enumerate() {
            prop_assert!(!stage.is_empty());
            let mut sorted = stage.clone();
            sorted.sort();
            prop_assert_eq!(&sorted, stage);
            for id in stage {
                prop_assert!(stage_of.insert(id.clone(), idx).is_none(), "{} planned twice", id);
            }
        }
        prop_assert_eq!(stage_of.len(), manifest.components.len());

        for component in &manifest.components {
            for dep in &component.depends_on {
                prop_assert!(stage_of[dep] < stage_of[&component.id]);
            }
        }
    }

    #[test]
    fn stages_are_as_early_as_possible(manifest in dag_manifest_strategy(12)) {
        let graph = DependencyGraph::from_manifest(&manifest).unwrap();
        let plan = graph.execution_order().unwrap();

        for component in &manifest.components {
            let stage = plan.stage_of(&component.id).unwrap();
            let expected = component
                .depends_on
                .iter()
                .map(|dep| plan.stage_of(dep).unwrap() + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(stage, expected);
        }
    }

    #[test]
    fn reversed_plan_puts_dependents_first(manifest in dag_manifest_strategy(12)) {
        let graph = DependencyGraph::from_manifest(&manifest).unwrap();
        let reversed = graph.execution_order().unwrap().reversed();

        for component in &manifest.components {
            for dep in &component.depends_on {
                prop_assert!(reversed.stage_of(&component.id) < reversed.stage_of(dep));
            }
        }
    }
}
