use tactile_common::{ColliderId, HandlerId, InteractorId};

/// Errors from structural simulation operations.
///
/// Touch and interaction protocol violations are not errors; those operations
/// log and return `false` or `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("unknown interactor {0}")]
    UnknownInteractor(InteractorId),
    #[error("unknown collider {0}")]
    UnknownCollider(ColliderId),
    #[error("unknown handler {0}")]
    UnknownHandler(HandlerId),
    #[error("{child} cannot inherit its mode from {parent}: the chain would loop")]
    CyclicInheritance {
        child: InteractorId,
        parent: InteractorId,
    },
}
