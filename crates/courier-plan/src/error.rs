use courier_core::Cell;
use thiserror::Error;

use crate::ActError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no plan applies to this goal")]
    NoApplicablePlan,

    #[error("stopped")]
    Stopped,

    #[error("stuck: no direction moves")]
    Stuck,

    #[error("no path to the destination")]
    PathUnavailable,

    #[error("next cell {0} is occupied")]
    Blocked(Cell),

    #[error("not at the expected cell")]
    NotPositioned,

    #[error(transparent)]
    Actuator(#[from] ActError),
}
