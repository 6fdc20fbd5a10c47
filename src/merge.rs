//! Entity reconciliation across files.
//!
//! Parsed entities arrive one per declaration site; this stage reduces them
//! to one canonical entity per `(name, kind)`. Structural duplicates collapse
//! silently. Divergent duplicates pick a winner by module precedence and
//! report a conflict warning. Extensions fold their members into the entity
//! they extend, and inherited members are pulled down from parents declared
//! in the same run.

use crate::error::MergeConflict;
use crate::model::{Entity, EntityKind, Member};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// Result of reconciliation: canonical entities plus non-fatal warnings.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub entities: Vec<Entity>,
    pub warnings: Vec<MergeConflict>,
}

/// Reduce per-file entities to one canonical entity per `(name, kind)`.
///
/// `imports` maps each scanned file to its import list; `precedence` lists
/// module names that win conflicts, in priority order. Output order is
/// deterministic regardless of input order.
pub fn merge_entities(
    entities: Vec<Entity>,
    imports: &BTreeMap<PathBuf, Vec<String>>,
    precedence: &[String],
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    let mut extensions: Vec<Entity> = Vec::new();
    let mut groups: BTreeMap<(String, EntityKind), Vec<Entity>> = BTreeMap::new();
    for entity in entities {
        if entity.kind == EntityKind::Extension {
            extensions.push(entity);
        } else {
            groups
                .entry((entity.name.clone(), entity.kind))
                .or_default()
                .push(entity);
        }
    }

    let mut merged: Vec<Entity> = Vec::new();
    for (_, mut group) in groups {
        // Lexicographic path order makes the collapse and the tie-break
        // independent of scan order.
        group.sort_by(|a, b| a.path.cmp(&b.path));
        let annotated = group.iter().any(|e| e.annotated);
        let history_annotated = group.iter().any(|e| e.history_annotated);

        let mut chosen = if group.len() == 1 || all_structurally_equal(&group) {
            group.swap_remove(0)
        } else {
            let winner = pick_by_precedence(&group, imports, precedence);
            let conflict = MergeConflict {
                name: group[winner].name.clone(),
                kind: group[winner].kind,
                chosen: group[winner].path.clone(),
                rejected: group
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != winner)
                    .map(|(_, e)| e.path.clone())
                    .collect(),
            };
            debug!(target: "merge", "{conflict}");
            outcome.warnings.push(conflict);
            group.swap_remove(winner)
        };
        chosen.annotated = annotated;
        chosen.history_annotated = history_annotated;
        merged.push(chosen);
    }

    fold_extensions(&mut merged, extensions);
    resolve_inheritance(&mut merged);

    merged.sort_by(|a, b| a.name.cmp(&b.name).then(a.kind.cmp(&b.kind)));
    outcome.entities = merged;
    outcome
}

fn all_structurally_equal(group: &[Entity]) -> bool {
    group
        .iter()
        .skip(1)
        .all(|e| group[0].structurally_equal(e))
}

/// Pick the group member whose file imports the highest-priority module.
/// Unmatched entities rank below any match; ties fall back to the group's
/// existing lexicographic path order.
fn pick_by_precedence(
    group: &[Entity],
    imports: &BTreeMap<PathBuf, Vec<String>>,
    precedence: &[String],
) -> usize {
    let rank = |entity: &Entity| -> usize {
        let Some(file_imports) = imports.get(&entity.path) else {
            return precedence.len();
        };
        precedence
            .iter()
            .position(|module| file_imports.iter().any(|i| i == module))
            .unwrap_or(precedence.len())
    };
    group
        .iter()
        .enumerate()
        .min_by_key(|(i, e)| (rank(e), *i))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Fold extension members into the entity they extend. Extensions of types
/// not declared in this run contribute nothing.
fn fold_extensions(merged: &mut [Entity], extensions: Vec<Entity>) {
    for extension in extensions {
        let Some(target) = merged.iter_mut().find(|e| e.name == extension.name) else {
            debug!(target: "merge", "extension of undeclared type {} skipped", extension.name);
            continue;
        };
        target.annotated |= extension.annotated;
        target.history_annotated |= extension.history_annotated;
        let existing: HashSet<String> = target.member_signatures().into_iter().collect();
        for member in extension.members {
            if !existing.contains(&member.signature()) {
                target.members.push(member);
            }
        }
    }
}

/// Pull inherited members down from parents declared in the same run.
/// Unresolvable parent names (library protocols, marker conformances) are
/// ignored. A visited set keeps inheritance cycles from looping.
fn resolve_inheritance(merged: &mut Vec<Entity>) {
    let catalog: BTreeMap<String, (Vec<Member>, Vec<String>)> = merged
        .iter()
        .map(|e| (e.name.clone(), (e.members.clone(), e.inherited.clone())))
        .collect();

    for entity in merged.iter_mut() {
        let mut existing: HashSet<String> = entity.member_signatures().into_iter().collect();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(entity.name.clone());
        let mut queue: Vec<String> = entity.inherited.clone();

        while let Some(parent_name) = queue.pop() {
            if !visited.insert(parent_name.clone()) {
                continue;
            }
            let Some((members, grandparents)) = catalog.get(&parent_name) else {
                continue;
            };
            for member in members {
                let signature = member.signature();
                if existing.insert(signature) {
                    entity.members.push(member.clone());
                }
            }
            queue.extend(grandparents.iter().cloned());
        }
    }
}
