use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use super::builder::WithdrawableTreeBuilder;
use super::domain::{ActingUser, DatePeriod, EntityId, EntityKind, EntityRef, WithdrawalReason};
use super::repository::{
    ApplicationWithdrawalPolicy, CascadeFailure, CascadeFailureSink, CollaboratorOutcome,
    DirectoryError, WithdrawalCollaborators, WithdrawalDirectory,
};
use super::tree::WithdrawableTreeNode;

/// Upper bound on cascade candidates per withdrawal. A real chain sits far
/// below this; exceeding it signals a malformed tree, not a large case.
pub const MAX_CASCADE_WITHDRAWALS: usize = 100;

/// Orchestrates withdrawals over a placement chain.
///
/// Each operation builds a fresh tree snapshot, validates the root against
/// it, delegates the root's transition to its collaborator, and then walks
/// the same snapshot to cascade-withdraw eligible descendants sequentially.
/// Nothing is cached between calls; callers scope each call to one
/// transaction holding the root's lock, and descendants are not re-evaluated
/// after individual cascade steps.
pub struct WithdrawalService<D, P, C, F> {
    directory: Arc<D>,
    policy: Arc<P>,
    collaborators: Arc<C>,
    failures: Arc<F>,
}

/// A record the acting user could withdraw directly, as returned by
/// [`WithdrawalService::all_directly_withdrawable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawableEntityView {
    pub kind: EntityKind,
    pub id: EntityId,
    pub date_periods: Vec<DatePeriod>,
}

impl WithdrawableEntityView {
    fn from_node(node: &WithdrawableTreeNode) -> Self {
        Self {
            kind: node.entity.kind,
            id: node.entity.id.clone(),
            date_periods: node.date_periods.clone(),
        }
    }
}

/// Success result of a root withdrawal. `cascaded` lists the descendants
/// whose collaborators reported success; per-item failures are only visible
/// through the failure sink and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalReceipt {
    pub root: EntityRef,
    pub reason: WithdrawalReason,
    pub cascaded: Vec<EntityRef>,
}

/// Error raised for the root of a withdrawal. Cascade-item failures never
/// surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WithdrawalError {
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error("user {user} may not directly withdraw this {kind}")]
    Unauthorized { user: String, kind: EntityKind },
    #[error("{0}")]
    Validation(String),
    #[error("withdrawal directory unavailable: {0}")]
    Directory(String),
}

impl WithdrawalError {
    fn from_directory(error: DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound(entity) => WithdrawalError::NotFound(entity),
            DirectoryError::Unavailable(message) => WithdrawalError::Directory(message),
        }
    }
}

impl<D, P, C, F> WithdrawalService<D, P, C, F>
where
    D: WithdrawalDirectory + 'static,
    P: ApplicationWithdrawalPolicy + 'static,
    C: WithdrawalCollaborators + 'static,
    F: CascadeFailureSink + 'static,
{
    pub fn new(directory: Arc<D>, policy: Arc<P>, collaborators: Arc<C>, failures: Arc<F>) -> Self {
        Self {
            directory,
            policy,
            collaborators,
            failures,
        }
    }

    /// Builds the withdrawable tree snapshot for any record in a chain.
    pub fn withdrawable_tree(
        &self,
        target: &EntityRef,
        user: &ActingUser,
    ) -> Result<WithdrawableTreeNode, WithdrawalError> {
        WithdrawableTreeBuilder::new(self.directory.as_ref(), self.policy.as_ref(), user)
            .build(target)
            .map_err(WithdrawalError::from_directory)
    }

    /// Everything in the target's tree the acting user could withdraw
    /// directly, pre-order. Performs no mutation.
    pub fn all_directly_withdrawable(
        &self,
        target: &EntityRef,
        user: &ActingUser,
    ) -> Result<Vec<WithdrawableEntityView>, WithdrawalError> {
        let tree = self.withdrawable_tree(target, user)?;
        Ok(tree
            .flatten()
            .into_iter()
            .filter(|node| node.state.withdrawable && node.state.user_may_directly_withdraw)
            .map(WithdrawableEntityView::from_node)
            .collect())
    }

    /// Withdraws the target and cascades to its eligible descendants.
    ///
    /// `occurred_at` is stamped on booking withdrawals; callers pass the
    /// current date. The root either fails before any mutation (not found,
    /// unauthorized, not withdrawable) or succeeds; descendants that fail to
    /// cascade afterwards are reported to the failure sink and do not affect
    /// the returned receipt's success.
    pub fn withdraw(
        &self,
        target: &EntityRef,
        user: &ActingUser,
        reason: WithdrawalReason,
        other_reason: Option<&str>,
        occurred_at: NaiveDate,
    ) -> Result<WithdrawalReceipt, WithdrawalError> {
        let tree = self.withdrawable_tree(target, user)?;

        if !tree.state.user_may_directly_withdraw {
            return Err(WithdrawalError::Unauthorized {
                user: user.id.clone(),
                kind: target.kind,
            });
        }

        // Withdrawal is terminal; repeating it is a no-op success.
        if tree.state.withdrawn {
            return Ok(WithdrawalReceipt {
                root: target.clone(),
                reason,
                cascaded: Vec::new(),
            });
        }

        if !tree.state.withdrawable {
            return Err(WithdrawalError::Validation(format!(
                "{} is not in a withdrawable state",
                target.kind
            )));
        }

        let outcome = self.invoke(target, user, reason, other_reason, occurred_at);
        match outcome {
            CollaboratorOutcome::Success => {}
            CollaboratorOutcome::NotFound => {
                return Err(WithdrawalError::NotFound(target.clone()));
            }
            CollaboratorOutcome::Unauthorized => {
                return Err(WithdrawalError::Unauthorized {
                    user: user.id.clone(),
                    kind: target.kind,
                });
            }
            CollaboratorOutcome::ValidationError(message) => {
                return Err(WithdrawalError::Validation(message));
            }
        }

        info!(root = %target, user = %user.id, reason = reason.label(), "withdrew root entity");

        let cascaded = self.cascade(&tree, target, user, reason, occurred_at);
        Ok(WithdrawalReceipt {
            root: target.clone(),
            reason,
            cascaded,
        })
    }

    /// Walks the snapshot taken before the root mutation and withdraws every
    /// eligible descendant in tree order.
    fn cascade(
        &self,
        tree: &WithdrawableTreeNode,
        root: &EntityRef,
        user: &ActingUser,
        reason: WithdrawalReason,
        occurred_at: NaiveDate,
    ) -> Vec<EntityRef> {
        // A node carrying a blocking reason is never force-withdrawn, even
        // when otherwise eligible. Its ancestors still cascade on their own
        // state; subtree-level blocking is a reporting concern (`notes`).
        let candidates: Vec<&WithdrawableTreeNode> = tree
            .descendants()
            .into_iter()
            .filter(|node| node.state.withdrawable && node.state.blocking_reason.is_none())
            .collect();

        // Invariant: a runaway candidate set means the tree construction is
        // defective. Abort before touching anything.
        if candidates.len() > MAX_CASCADE_WITHDRAWALS {
            panic!(
                "cascade for {root} selected {} descendants, above the cap of {MAX_CASCADE_WITHDRAWALS}",
                candidates.len()
            );
        }

        // Invariant: a chain never spans applications. A stray owner would
        // withdraw another application's records.
        if let Some(stray) = candidates
            .iter()
            .find(|node| node.owner_application_id != tree.owner_application_id)
        {
            panic!(
                "cascade for {root} reached {} owned by application {}, outside application {}",
                stray.entity, stray.owner_application_id, tree.owner_application_id
            );
        }

        let mut cascaded = Vec::with_capacity(candidates.len());
        for node in candidates {
            let outcome = self.invoke(&node.entity, user, reason, None, occurred_at);
            if outcome.is_success() {
                info!(root = %root, entity = %node.entity, "cascade-withdrew descendant");
                cascaded.push(node.entity.clone());
            } else {
                error!(
                    root = %root,
                    entity = %node.entity,
                    error = %outcome.describe(),
                    "cascade withdrawal failed, continuing with remaining descendants"
                );
                self.failures.report(CascadeFailure {
                    root: root.clone(),
                    entity: node.entity.clone(),
                    outcome,
                });
            }
        }
        cascaded
    }

    fn invoke(
        &self,
        entity: &EntityRef,
        user: &ActingUser,
        reason: WithdrawalReason,
        other_reason: Option<&str>,
        occurred_at: NaiveDate,
    ) -> CollaboratorOutcome {
        match entity.kind {
            EntityKind::Application => {
                self.collaborators
                    .withdraw_application(&entity.id, user, reason, other_reason)
            }
            EntityKind::PlacementRequest => {
                self.collaborators
                    .withdraw_placement_request(&entity.id, user, reason)
            }
            EntityKind::MatchRequest => {
                self.collaborators
                    .withdraw_match_request(&entity.id, user, reason)
            }
            EntityKind::Booking => {
                self.collaborators
                    .withdraw_booking(&entity.id, user, occurred_at, reason, None)
            }
        }
    }
}
