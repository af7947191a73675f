// Provider gateway adapters

pub mod http_gateway;
pub mod scripted_gateway;

pub use http_gateway::{HttpGatewayConfig, HttpProviderGateway};
pub use scripted_gateway::{RecordedCall, Reply, ScriptedGateway};
