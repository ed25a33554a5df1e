pub mod client;

pub use client::{
    AuthTokens, CreateClientPayload, CreateClientRequest, CreateClientResponse, ProvisionOutcome,
    ResourceId, UserProfile, TRUST_PRICE, WILL_PRICE,
};
