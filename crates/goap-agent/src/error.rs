use goap_core::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("agent `{agent}` designates unknown emergency goal `{goal}`")]
    UnknownEmergencyGoal { agent: String, goal: String },

    #[error("duplicate agent name `{0}`")]
    DuplicateAgent(String),

    #[error("agent `{agent}` was built against a different world store")]
    ForeignStore { agent: String },
}
