// Cache policy agent and the controller that enforces its decisions

pub mod controller;
pub mod policy;

pub use controller::Controller;
pub use policy::{PolicyAgent, PolicyDecision, RiskSnapshot};
