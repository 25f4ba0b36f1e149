//! Behavioral modes as closed enums with explicit transition tables.
//!
//! Every entity type that switches modes lists its legal moves in
//! [`StateMachine::TABLE`]. Anything not listed is rejected, so the set of
//! reachable states can be read straight off the table.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{machine}: no transition from {from} on {trigger}")]
pub struct TransitionError {
    pub machine: &'static str,
    pub from: String,
    pub trigger: String,
}

pub trait StateMachine: Copy + PartialEq + fmt::Debug + 'static {
    type Trigger: Copy + PartialEq + fmt::Debug + 'static;

    const NAME: &'static str;

    /// `(from, trigger, to)` rows.
    const TABLE: &'static [(Self, Self::Trigger, Self)];

    fn fire(self, trigger: Self::Trigger) -> Result<Self, TransitionError> {
        Self::TABLE
            .iter()
            .find(|(from, t, _)| *from == self && *t == trigger)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| TransitionError {
                machine: Self::NAME,
                from: format!("{self:?}"),
                trigger: format!("{trigger:?}"),
            })
    }

    fn permits(self, trigger: Self::Trigger) -> bool {
        Self::TABLE
            .iter()
            .any(|(from, t, _)| *from == self && *t == trigger)
    }
}

/// Applies `trigger` in place. A rejected transition leaves the state as is.
pub fn advance<S: StateMachine>(state: &mut S, trigger: S::Trigger) -> bool {
    match state.fire(trigger) {
        Ok(next) => {
            *state = next;
            true
        }
        Err(err) => {
            tracing::warn!(%err, "Rejected state transition");
            false
        }
    }
}

/// Fires `trigger` only when the table allows it, without logging.
pub fn advance_if_permitted<S: StateMachine>(state: &mut S, trigger: S::Trigger) -> bool {
    if state.permits(trigger) {
        advance(state, trigger)
    } else {
        false
    }
}
