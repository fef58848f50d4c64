use super::domain::{
    ActingUser, Application, Booking, DatePeriod, EntityKind, EntityRef, MatchRequest,
    PlacementRequest,
};
use super::repository::{ApplicationWithdrawalPolicy, DirectoryError, WithdrawalDirectory};
use super::state;
use super::tree::WithdrawableTreeNode;

/// Builds the withdrawable tree for any record in a placement chain.
///
/// Construction is a pure read: each node's state comes from the matching
/// state provider, and each relationship edge recurses into the builder for
/// the child's own kind. A missing optional relationship simply produces no
/// child on that edge.
pub struct WithdrawableTreeBuilder<'a, D, P> {
    directory: &'a D,
    policy: &'a P,
    user: &'a ActingUser,
}

impl<'a, D, P> WithdrawableTreeBuilder<'a, D, P>
where
    D: WithdrawalDirectory,
    P: ApplicationWithdrawalPolicy,
{
    pub fn new(directory: &'a D, policy: &'a P, user: &'a ActingUser) -> Self {
        Self {
            directory,
            policy,
            user,
        }
    }

    pub fn build(&self, target: &EntityRef) -> Result<WithdrawableTreeNode, DirectoryError> {
        match target.kind {
            EntityKind::Application => {
                let application = self
                    .directory
                    .application(&target.id)?
                    .ok_or_else(|| DirectoryError::NotFound(target.clone()))?;
                self.application_node(&application)
            }
            EntityKind::PlacementRequest => {
                let request = self
                    .directory
                    .placement_request(&target.id)?
                    .ok_or_else(|| DirectoryError::NotFound(target.clone()))?;
                self.placement_request_node(&request)
            }
            EntityKind::MatchRequest => {
                let request = self
                    .directory
                    .match_request(&target.id)?
                    .ok_or_else(|| DirectoryError::NotFound(target.clone()))?;
                self.match_request_node(&request)
            }
            EntityKind::Booking => {
                let booking = self
                    .directory
                    .booking(&target.id)?
                    .ok_or_else(|| DirectoryError::NotFound(target.clone()))?;
                Ok(self.booking_node(&booking))
            }
        }
    }

    fn application_node(
        &self,
        application: &Application,
    ) -> Result<WithdrawableTreeNode, DirectoryError> {
        let policy_allows = self.policy.application_may_be_withdrawn(application);
        let node_state = state::application_state(application, policy_allows, self.user);

        let mut children = Vec::new();
        for request in self
            .directory
            .placement_requests_for_application(&application.id)?
        {
            if request.superseded || request.submitted_at.is_none() {
                continue;
            }
            children.push(self.placement_request_node(&request)?);
        }

        // Legacy shape: a match request hung directly off the application's
        // initial arrival date, with no placement request in between.
        if let Some(implicit) = self.directory.implicit_match_request(&application.id)? {
            children.push(self.match_request_node(&implicit)?);
        }

        Ok(WithdrawableTreeNode {
            owner_application_id: application.id.clone(),
            entity: EntityRef::new(EntityKind::Application, application.id.clone()),
            state: node_state,
            date_periods: Vec::new(),
            children,
        })
    }

    fn placement_request_node(
        &self,
        request: &PlacementRequest,
    ) -> Result<WithdrawableTreeNode, DirectoryError> {
        let node_state = state::placement_request_state(request, self.user);

        let mut children = Vec::new();
        if let Some(match_request) = self
            .directory
            .match_request_for_placement_request(&request.id)?
        {
            children.push(self.match_request_node(&match_request)?);
        }

        Ok(WithdrawableTreeNode {
            owner_application_id: request.application_id.clone(),
            entity: EntityRef::new(EntityKind::PlacementRequest, request.id.clone()),
            state: node_state,
            date_periods: vec![DatePeriod::from_duration(
                request.expected_arrival,
                request.duration_days,
            )],
            children,
        })
    }

    fn match_request_node(
        &self,
        request: &MatchRequest,
    ) -> Result<WithdrawableTreeNode, DirectoryError> {
        let node_state = state::match_request_state(request, self.user);

        let children = self
            .directory
            .bookings_for_match_request(&request.id)?
            .iter()
            .map(|booking| self.booking_node(booking))
            .collect();

        Ok(WithdrawableTreeNode {
            owner_application_id: request.application_id.clone(),
            entity: EntityRef::new(EntityKind::MatchRequest, request.id.clone()),
            state: node_state,
            date_periods: vec![DatePeriod::from_duration(
                request.expected_arrival,
                request.duration_days,
            )],
            children,
        })
    }

    fn booking_node(&self, booking: &Booking) -> WithdrawableTreeNode {
        WithdrawableTreeNode {
            owner_application_id: booking.application_id.clone(),
            entity: EntityRef::new(EntityKind::Booking, booking.id.clone()),
            state: state::booking_state(booking, self.user),
            date_periods: vec![DatePeriod::new(booking.arrival_date, booking.departure_date)],
            children: Vec::new(),
        }
    }
}
