use thiserror::Error;

/// Construction-time model errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("action `{action}` has invalid cost {cost} (must be finite and > 0)")]
    InvalidCost { action: String, cost: f32 },

    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },

    #[error("duplicate action name `{0}`")]
    DuplicateAction(String),

    #[error("duplicate goal name `{0}`")]
    DuplicateGoal(String),
}
