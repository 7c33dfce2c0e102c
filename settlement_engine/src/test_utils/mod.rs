pub mod fake_gateway;
pub mod prepare_env;

pub use fake_gateway::ScriptedGateway;
