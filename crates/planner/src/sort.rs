//! Ordering a batch by the dependencies its packages declare

use crate::traits::DependencySorter;
use appctl_errors::{PlanError, Result};
use appctl_types::{AppId, AppPackage};
use std::collections::{BTreeSet, HashMap};

/// Topological sort over declared dependencies
///
/// Kahn's algorithm with a sorted ready set, so packages without an ordering
/// constraint between them keep their input order. Dependencies on apps that
/// are not part of the batch are assumed to be satisfied already and are
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredDependencySorter;

impl DeclaredDependencySorter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DependencySorter for DeclaredDependencySorter {
    fn sort(&self, packages: &[AppPackage]) -> Result<Vec<AppPackage>> {
        Ok(topological_order(packages)?
            .into_iter()
            .map(|index| packages[index].clone())
            .collect())
    }
}

/// Returns indices into `packages` in install order
fn topological_order(packages: &[AppPackage]) -> std::result::Result<Vec<usize>, PlanError> {
    // Duplicate ids resolve to their first occurrence
    let mut index_of: HashMap<&AppId, usize> = HashMap::new();
    for (index, package) in packages.iter().enumerate() {
        index_of.entry(&package.app_id).or_insert(index);
    }

    let mut in_degree = vec![0usize; packages.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); packages.len()];

    for (index, package) in packages.iter().enumerate() {
        let mut seen = BTreeSet::new();
        for dependency in &package.dependencies {
            let Some(&provider) = index_of.get(dependency) else {
                continue;
            };
            if provider == index || !seen.insert(provider) {
                continue;
            }
            dependents[provider].push(index);
            in_degree[index] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(index, _)| index)
        .collect();
    let mut order = Vec::with_capacity(packages.len());

    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != packages.len() {
        let apps = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(index, _)| packages[index].name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PlanError::CircularDependency { apps });
    }

    Ok(order)
}
