//! Adjacency table for the case-file workflow.
//!
//! ```text
//! draft          ──▶ pending_review
//! pending_review ──▶ ready | draft
//! ready          ──▶ submitted | pending_review
//! submitted      ──▶ favorable | denied | required
//! required       ──▶ submitted | pending_review
//! favorable      ──▶ archived
//! denied         ──▶ archived
//! ```
//!
//! The graph is plain data so it can be injected into the engine and asserted on directly.

use super::domain::CaseStatus;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusGraph {
    initial: CaseStatus,
    edges: BTreeMap<CaseStatus, Vec<CaseStatus>>,
}

/// Serializable view of the outgoing edges of one state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusNodeView {
    pub status: CaseStatus,
    pub label: &'static str,
    pub editable: bool,
    pub terminal: bool,
    pub next: Vec<CaseStatus>,
}

impl StatusGraph {
    pub fn standard() -> Self {
        Self::from_edges(
            CaseStatus::Draft,
            [
                (CaseStatus::Draft, CaseStatus::PendingReview),
                (CaseStatus::PendingReview, CaseStatus::Ready),
                (CaseStatus::PendingReview, CaseStatus::Draft),
                (CaseStatus::Ready, CaseStatus::Submitted),
                (CaseStatus::Ready, CaseStatus::PendingReview),
                (CaseStatus::Submitted, CaseStatus::Favorable),
                (CaseStatus::Submitted, CaseStatus::Denied),
                (CaseStatus::Submitted, CaseStatus::Required),
                (CaseStatus::Required, CaseStatus::Submitted),
                (CaseStatus::Required, CaseStatus::PendingReview),
                (CaseStatus::Favorable, CaseStatus::Archived),
                (CaseStatus::Denied, CaseStatus::Archived),
            ],
        )
    }

    /// Builds a graph from directed edges. Self-edges are dropped and duplicates collapsed.
    pub fn from_edges<I>(initial: CaseStatus, edges: I) -> Self
    where
        I: IntoIterator<Item = (CaseStatus, CaseStatus)>,
    {
        let mut table: BTreeMap<CaseStatus, Vec<CaseStatus>> = CaseStatus::ordered()
            .into_iter()
            .map(|status| (status, Vec::new()))
            .collect();

        for (from, to) in edges {
            if from == to {
                continue;
            }
            let targets = table.entry(from).or_default();
            if !targets.contains(&to) {
                targets.push(to);
            }
        }

        Self {
            initial,
            edges: table,
        }
    }

    pub fn initial(&self) -> CaseStatus {
        self.initial
    }

    pub fn allows(&self, from: CaseStatus, to: CaseStatus) -> bool {
        self.edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    pub fn next_states(&self, from: CaseStatus) -> &[CaseStatus] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_terminal(&self, status: CaseStatus) -> bool {
        self.next_states(status).is_empty()
    }

    /// Every directed edge in display order of the source state.
    pub fn edges(&self) -> Vec<(CaseStatus, CaseStatus)> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
            .collect()
    }

    pub fn describe(&self) -> Vec<StatusNodeView> {
        CaseStatus::ordered()
            .into_iter()
            .map(|status| StatusNodeView {
                status,
                label: status.label(),
                editable: status.is_editable(),
                terminal: self.is_terminal(status),
                next: self.next_states(status).to_vec(),
            })
            .collect()
    }
}

impl Default for StatusGraph {
    fn default() -> Self {
        Self::standard()
    }
}
