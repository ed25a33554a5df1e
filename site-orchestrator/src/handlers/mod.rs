pub mod crm;
pub mod health;
pub mod proxy;

pub use crm::crm_passthrough;
pub use health::health_check;
pub use proxy::graphql_proxy;
