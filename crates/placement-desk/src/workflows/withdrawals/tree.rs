use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use super::domain::{DatePeriod, EntityId, EntityRef};
use super::state::{BlockingReason, WithdrawableState};

/// One record in a withdrawable tree: the record's own state plus the
/// subtrees of everything depending on it.
///
/// A tree is a disposable snapshot built fresh from the directory for every
/// operation. It owns its children outright and carries no back-references,
/// so there are no cycles to guard against. Every node in a well-formed tree
/// shares the root's `owner_application_id`; the cascade executor checks
/// this rather than assuming it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawableTreeNode {
    pub owner_application_id: EntityId,
    pub entity: EntityRef,
    pub state: WithdrawableState,
    pub date_periods: Vec<DatePeriod>,
    pub children: Vec<WithdrawableTreeNode>,
}

impl WithdrawableTreeNode {
    /// The node and every descendant, pre-order.
    pub fn flatten(&self) -> Vec<&WithdrawableTreeNode> {
        let mut nodes = Vec::new();
        self.collect(&mut nodes);
        nodes
    }

    fn collect<'a>(&'a self, into: &mut Vec<&'a WithdrawableTreeNode>) {
        into.push(self);
        for child in &self.children {
            child.collect(into);
        }
    }

    /// Every descendant in pre-order, excluding the node itself.
    pub fn descendants(&self) -> Vec<&WithdrawableTreeNode> {
        let mut nodes = self.flatten();
        nodes.remove(0);
        nodes
    }

    /// A node is blocked if it carries a blocking reason itself or any
    /// descendant does. Blocking bubbles toward the root: a booking with an
    /// arrival blocks its match request, placement request, and application.
    pub fn is_blocked(&self) -> bool {
        self.state.blocking_reason.is_some() || self.children.iter().any(|c| c.is_blocked())
    }

    /// Distinct blocking reasons present anywhere in the subtree.
    pub fn blocking_reasons(&self) -> BTreeSet<BlockingReason> {
        self.flatten()
            .into_iter()
            .filter_map(|node| node.state.blocking_reason)
            .collect()
    }

    /// One human-readable line per distinct blocking reason in the subtree,
    /// for surfacing "why can't I withdraw everything" to a caller.
    pub fn notes(&self) -> Vec<&'static str> {
        self.blocking_reasons()
            .into_iter()
            .map(BlockingReason::note)
            .collect()
    }

    /// Indented plain-text listing of the tree for logs and the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, depth: usize, out: &mut String) {
        let mut flags: Vec<String> = Vec::new();
        if self.state.withdrawn {
            flags.push("withdrawn".to_string());
        } else if self.state.withdrawable {
            flags.push("withdrawable".to_string());
        } else {
            flags.push("not withdrawable".to_string());
        }
        if self.state.user_may_directly_withdraw {
            flags.push("direct".to_string());
        }
        if let Some(reason) = self.state.blocking_reason {
            flags.push(format!("blocked: {}", reason.label()));
        }

        let _ = writeln!(
            out,
            "{:indent$}{} [{}]",
            "",
            self.entity,
            flags.join(", "),
            indent = depth * 2
        );
        for child in &self.children {
            child.render_into(depth + 1, out);
        }
    }
}
