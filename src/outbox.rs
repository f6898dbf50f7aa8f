//! Pending-proposal outbox.
//!
//! Adjustments classified MEDIUM or HIGH wait here for a human decision.
//! The outbox is an explicit store owned by one core instance and passed by
//! handle; nothing reads it ambiently.

use serde::{Deserialize, Serialize};

use crate::autonomy::{Adjustment, ImpactLevel};
use crate::clock::now_secs;

/// Identifier for a queued proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub u64);

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Lifecycle of a queued proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Waiting for a decision.
    Pending,
    /// Surfaced to the user, still undecided.
    Delivered,
    /// Approved by the user.
    Confirmed,
    /// Declined by the user.
    Dismissed,
    /// Timed out unanswered.
    Expired,
}

/// One adjustment awaiting confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub adjustment: Adjustment,
    pub level: ImpactLevel,
    pub status: ProposalStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Store of proposals awaiting human decisions.
#[derive(Debug)]
pub struct Outbox {
    proposals: Vec<Proposal>,
    next_id: u64,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            proposals: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild from persisted proposals.
    pub fn from_proposals(proposals: Vec<Proposal>) -> Self {
        let next_id = proposals.iter().map(|p| p.id.0).max().unwrap_or(0) + 1;
        Self { proposals, next_id }
    }

    /// Queue an adjustment for confirmation.
    pub fn append(&mut self, adjustment: Adjustment, level: ImpactLevel) -> ProposalId {
        let now = now_secs();
        let id = ProposalId(self.next_id);
        self.next_id += 1;
        self.proposals.push(Proposal {
            id,
            adjustment,
            level,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id == id)
    }

    /// Proposals still awaiting a decision (pending or delivered).
    pub fn pending(&self) -> Vec<&Proposal> {
        self.proposals
            .iter()
            .filter(|p| matches!(p.status, ProposalStatus::Pending | ProposalStatus::Delivered))
            .collect()
    }

    /// Move a proposal to a new status. `None` on a missing id.
    pub fn mark(&mut self, id: ProposalId, status: ProposalStatus) -> Option<&Proposal> {
        let proposal = self.proposals.iter_mut().find(|p| p.id == id)?;
        proposal.status = status;
        proposal.updated_at = now_secs();
        Some(proposal)
    }

    /// Expire undecided proposals older than `ttl_secs`. Returns how many
    /// were expired.
    pub fn expire(&mut self, now: u64, ttl_secs: u64) -> usize {
        let mut expired = 0;
        for proposal in &mut self.proposals {
            let undecided = matches!(
                proposal.status,
                ProposalStatus::Pending | ProposalStatus::Delivered
            );
            if undecided && now.saturating_sub(proposal.created_at) > ttl_secs {
                proposal.status = ProposalStatus::Expired;
                proposal.updated_at = now;
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::info!(expired, "expired unanswered proposals");
        }
        expired
    }

    /// All proposals, oldest first.
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
