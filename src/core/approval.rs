use std::str::FromStr;

use crate::model::request::RequestStatus;
use crate::model::role::Role;

/// The three sequential approval stages a leave/advance request passes
/// through, in order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Supervisor,
    Hr,
    Admin,
}

impl Stage {
    /// The role allowed to decide at the stage after this one, if any.
    fn next_role(&self) -> Option<Role> {
        match self {
            Stage::Supervisor => Some(Role::Hr),
            Stage::Hr => Some(Role::Admin),
            Stage::Admin => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Snapshot of a request's workflow state as read from storage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ApprovalState {
    pub status: RequestStatus,
    pub supervisor_approved: bool,
    pub hr_approved: bool,
    pub admin_approved: bool,
}

impl ApprovalState {
    pub fn parse(
        status: &str,
        supervisor_approved: bool,
        hr_approved: bool,
        admin_approved: bool,
    ) -> Option<Self> {
        Some(Self {
            status: RequestStatus::from_str(status).ok()?,
            supervisor_approved,
            hr_approved,
            admin_approved,
        })
    }

    /// The stage currently awaiting a decision, if the request is live.
    fn pending_stage(&self) -> Option<Stage> {
        if self.status != RequestStatus::Pending {
            return None;
        }
        if !self.supervisor_approved {
            Some(Stage::Supervisor)
        } else if !self.hr_approved {
            Some(Stage::Hr)
        } else if !self.admin_approved {
            Some(Stage::Admin)
        } else {
            None
        }
    }
}

/// What a legal decision does to the request, for the caller to apply as a
/// single conditional update.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Transition {
    pub stage: Stage,
    pub decision: Decision,
    /// Status after the transition: unchanged Pending mid-chain, Approved
    /// at the admin stage, Rejected on any rejection.
    pub new_status: RequestStatus,
    /// True only when this approval sets the stage flag.
    pub approves_stage: bool,
    /// Role to fan notifications out to so they pick the request up next.
    pub notify_role: Option<Role>,
    /// Terminal approval retires every notification tied to the request.
    pub clear_notifications: bool,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        self.new_status != RequestStatus::Pending
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ApprovalError {
    /// The acting role's stage is not the one currently pending.
    #[error("Not this role's turn to act on the request")]
    OutOfTurn,
    /// The request is terminal or the stage was already decided.
    #[error("Request already processed at this stage")]
    AlreadyProcessed,
}

/// Decide a stage. Pure: computes the transition (or refuses) without
/// touching storage. Rejection is terminal from any stage; approvals must
/// arrive strictly in supervisor -> HR -> admin order.
pub fn decide(
    state: &ApprovalState,
    stage: Stage,
    decision: Decision,
) -> Result<Transition, ApprovalError> {
    let pending = match state.pending_stage() {
        Some(p) => p,
        // Approved/Rejected, or a fully-flagged request: nothing may act.
        None => return Err(ApprovalError::AlreadyProcessed),
    };

    if stage != pending {
        // A stage that already signed off gets Conflict, not Forbidden.
        let already_done = match stage {
            Stage::Supervisor => state.supervisor_approved,
            Stage::Hr => state.hr_approved,
            Stage::Admin => state.admin_approved,
        };
        return Err(if already_done {
            ApprovalError::AlreadyProcessed
        } else {
            ApprovalError::OutOfTurn
        });
    }

    match decision {
        Decision::Reject => Ok(Transition {
            stage,
            decision,
            new_status: RequestStatus::Rejected,
            approves_stage: false,
            notify_role: None,
            clear_notifications: false,
        }),
        Decision::Approve => {
            let terminal = stage == Stage::Admin;
            Ok(Transition {
                stage,
                decision,
                new_status: if terminal {
                    RequestStatus::Approved
                } else {
                    RequestStatus::Pending
                },
                approves_stage: true,
                notify_role: stage.next_role(),
                clear_notifications: terminal,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fresh() -> ApprovalState {
        ApprovalState {
            status: RequestStatus::Pending,
            supervisor_approved: false,
            hr_approved: false,
            admin_approved: false,
        }
    }

    fn apply(state: &ApprovalState, t: &Transition) -> ApprovalState {
        let mut next = *state;
        next.status = t.new_status;
        if t.approves_stage {
            match t.stage {
                Stage::Supervisor => next.supervisor_approved = true,
                Stage::Hr => next.hr_approved = true,
                Stage::Admin => next.admin_approved = true,
            }
        }
        next
    }

    #[test]
    fn full_round_trip_to_admin_approval() {
        let state = fresh();

        let t1 = decide(&state, Stage::Supervisor, Decision::Approve).unwrap();
        assert_eq!(t1.new_status, RequestStatus::Pending);
        assert_eq!(t1.notify_role, Some(Role::Hr));
        assert!(!t1.clear_notifications);
        let state = apply(&state, &t1);

        let t2 = decide(&state, Stage::Hr, Decision::Approve).unwrap();
        assert_eq!(t2.new_status, RequestStatus::Pending);
        assert_eq!(t2.notify_role, Some(Role::Admin));
        let state = apply(&state, &t2);
        assert!(state.hr_approved);
        assert!(!state.admin_approved);

        let t3 = decide(&state, Stage::Admin, Decision::Approve).unwrap();
        assert_eq!(t3.new_status, RequestStatus::Approved);
        assert_eq!(t3.notify_role, None);
        assert!(t3.clear_notifications);
        assert!(t3.is_terminal());
    }

    #[test]
    fn hr_cannot_act_before_supervisor() {
        let err = decide(&fresh(), Stage::Hr, Decision::Approve).unwrap_err();
        assert_eq!(err, ApprovalError::OutOfTurn);

        let err = decide(&fresh(), Stage::Admin, Decision::Approve).unwrap_err();
        assert_eq!(err, ApprovalError::OutOfTurn);
    }

    #[test]
    fn same_stage_cannot_decide_twice() {
        let state = fresh();
        let t = decide(&state, Stage::Supervisor, Decision::Approve).unwrap();
        let state = apply(&state, &t);

        let err = decide(&state, Stage::Supervisor, Decision::Approve).unwrap_err();
        assert_eq!(err, ApprovalError::AlreadyProcessed);
    }

    #[test]
    fn reject_is_terminal_at_any_stage() {
        let state = fresh();
        let t = decide(&state, Stage::Supervisor, Decision::Reject).unwrap();
        assert_eq!(t.new_status, RequestStatus::Rejected);
        assert!(!t.approves_stage);
        assert_eq!(t.notify_role, None);

        let rejected = apply(&state, &t);
        for stage in [Stage::Supervisor, Stage::Hr, Stage::Admin] {
            for decision in [Decision::Approve, Decision::Reject] {
                assert_eq!(
                    decide(&rejected, stage, decision).unwrap_err(),
                    ApprovalError::AlreadyProcessed
                );
            }
        }
    }

    #[test]
    fn hr_reject_after_supervisor_approval() {
        let state = fresh();
        let state = apply(&state, &decide(&state, Stage::Supervisor, Decision::Approve).unwrap());

        let t = decide(&state, Stage::Hr, Decision::Reject).unwrap();
        let state = apply(&state, &t);

        assert_eq!(state.status, RequestStatus::Rejected);
        assert!(state.supervisor_approved); // earlier flag untouched
        assert!(!state.hr_approved);
        assert_eq!(
            decide(&state, Stage::Admin, Decision::Approve).unwrap_err(),
            ApprovalError::AlreadyProcessed
        );
    }

    #[test]
    fn terminal_approved_state_refuses_everything() {
        let state = ApprovalState {
            status: RequestStatus::Approved,
            supervisor_approved: true,
            hr_approved: true,
            admin_approved: true,
        };
        assert_eq!(
            decide(&state, Stage::Admin, Decision::Reject).unwrap_err(),
            ApprovalError::AlreadyProcessed
        );
    }

    #[test]
    fn parses_storage_state() {
        let state = ApprovalState::parse("Pending", true, false, false).unwrap();
        assert_eq!(state.status, RequestStatus::Pending);
        assert!(state.supervisor_approved);
        assert!(ApprovalState::parse("bogus", false, false, false).is_none());
    }
}
