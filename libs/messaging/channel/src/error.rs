use crate::Direction;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("{0} queue is closed")]
    Closed(Direction),

    #[error("{0} consumer was already taken")]
    AlreadyTaken(Direction),

    #[error("{0} consumer is still in place")]
    NotTaken(Direction),

    #[error("cannot hand a {0} consumer back to another queue")]
    WrongDirection(Direction),
}
