//! Progress report over a roadmap.

use crate::course::{Module, SubModule, SubModuleStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub id: String,
    pub title: String,
    pub completed: usize,
    pub total: usize,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub completed_submodules: usize,
    pub total_submodules: usize,
    /// Mean score over completed submodules; `None` until one is scored.
    pub average_score: Option<f64>,
    pub modules: Vec<ModuleProgress>,
}

impl ProgressReport {
    pub fn from_modules(modules: &[Module]) -> Self {
        let all: Vec<&SubModule> = modules.iter().flat_map(|m| &m.submodules).collect();
        Self {
            completed_submodules: completed(&all),
            total_submodules: all.len(),
            average_score: mean_score(&all),
            modules: modules
                .iter()
                .map(|m| {
                    let subs: Vec<&SubModule> = m.submodules.iter().collect();
                    ModuleProgress {
                        id: m.id.clone(),
                        title: m.title.clone(),
                        completed: completed(&subs),
                        total: subs.len(),
                        average_score: mean_score(&subs),
                    }
                })
                .collect(),
        }
    }
}

fn completed(subs: &[&SubModule]) -> usize {
    subs.iter()
        .filter(|s| s.status == SubModuleStatus::Completed)
        .count()
}

fn mean_score(subs: &[&SubModule]) -> Option<f64> {
    let scores: Vec<f64> = subs
        .iter()
        .filter(|s| s.status == SubModuleStatus::Completed)
        .filter_map(|s| s.score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
