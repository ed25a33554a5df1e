pub mod crm_api;

pub use crm_api::{CrmApi, CrmRequest, CrmResponse, UpstreamCrmApi};
