pub mod health;
pub mod site;
pub mod snug_client;

pub use health::health_check;
pub use site::staff_portal_guard;
pub use snug_client::create_snug_client;
