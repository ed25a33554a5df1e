use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::Validate;

/// Will preparation price, in cents.
pub const WILL_PRICE: u32 = 29_999;
/// Trust preparation price, in cents.
pub const TRUST_PRICE: u32 = 59_999;

/// Inbound body of `POST /api/snug-client`.
///
/// A field that is missing, `null` or not a string reads as empty, so every
/// malformed field is rejected by validation the same way.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[serde(default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1))]
    pub first_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1))]
    pub last_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1))]
    pub email: String,
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

impl CreateClientRequest {
    /// Parse a raw request body regardless of its content type. A body that
    /// is empty or not a JSON object yields an empty request.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body sent to the pro-people-roles endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateClientPayload {
    pub client_data: ClientData,
    pub client_role: ClientRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientData {
    pub full_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRole {
    pub will_price: u32,
    pub trust_price: u32,
}

impl From<&CreateClientRequest> for CreateClientPayload {
    fn from(request: &CreateClientRequest) -> Self {
        Self {
            client_data: ClientData {
                full_name: request.full_name(),
                contact_email: request.email.clone(),
            },
            client_role: ClientRole {
                will_price: WILL_PRICE,
                trust_price: TRUST_PRICE,
            },
        }
    }
}

/// Token pair returned by the identity endpoint. Lives for one request only.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    #[serde(rename = "access")]
    pub access_token: String,
    /// Unused; some identity deployments omit it.
    #[serde(rename = "refresh", default)]
    pub refresh_token: String,
}

/// Identifier as the data API emits it: sometimes a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(n) => write!(f, "{}", n),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub subject_id: ResourceId,
    pub professional_group_id: ResourceId,
}

/// `GET /api/v3/user-data/?expand=professional_group_role`
#[derive(Debug, Deserialize)]
pub(crate) struct UserDataEnvelope {
    pub data: UserData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    pub ud_id: ResourceId,
    pub professional_group_role_user_data: ProfessionalGroupRole,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfessionalGroupRole {
    pub professional_group_id: ResourceId,
}

impl From<UserDataEnvelope> for UserProfile {
    fn from(envelope: UserDataEnvelope) -> Self {
        Self {
            subject_id: envelope.data.ud_id,
            professional_group_id: envelope
                .data
                .professional_group_role_user_data
                .professional_group_id,
        }
    }
}

/// What a successful provisioning run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    /// The downstream record, untouched.
    Created(serde_json::Value),
    /// The downstream API reported the client as a duplicate.
    AlreadyExists,
}

/// `200` body of `POST /api/snug-client`.
#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
    pub success: bool,
    pub message: String,
    pub data: serde_json::Value,
}

impl From<ProvisionOutcome> for CreateClientResponse {
    fn from(outcome: ProvisionOutcome) -> Self {
        match outcome {
            ProvisionOutcome::Created(record) => Self {
                success: true,
                message: "GetSnug client created successfully".to_string(),
                data: record,
            },
            ProvisionOutcome::AlreadyExists => Self {
                success: true,
                message: "GetSnug client already exists".to_string(),
                data: serde_json::json!({ "note": "Client already exists" }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_empty_fields_fail_validation() {
        let missing: CreateClientRequest =
            serde_json::from_value(json!({ "firstName": "Ana", "email": "ana@example.com" }))
                .unwrap();
        assert!(missing.validate().is_err());

        let empty: CreateClientRequest = serde_json::from_value(
            json!({ "firstName": "Ana", "lastName": "", "email": "ana@example.com" }),
        )
        .unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn null_and_non_string_fields_read_as_empty() {
        let request = CreateClientRequest::from_body(
            br#"{"firstName":null,"lastName":7,"email":"ana@example.com"}"#,
        );
        assert_eq!(request.first_name, "");
        assert_eq!(request.last_name, "");
        assert_eq!(request.email, "ana@example.com");
        assert!(request.validate().is_err());
    }

    #[test]
    fn unparseable_bodies_yield_an_empty_request() {
        let bodies: [&[u8]; 4] = [b"", b"firstName=Ana", b"[1,2]", br#"{"firstName":"#];
        for body in bodies {
            let request = CreateClientRequest::from_body(body);
            assert!(request.first_name.is_empty());
            assert!(request.validate().is_err());
        }
    }

    #[test]
    fn login_reply_without_refresh_token_is_accepted() {
        let tokens: AuthTokens = serde_json::from_value(json!({ "access": "a-1" })).unwrap();
        assert_eq!(tokens.access_token, "a-1");
        assert!(tokens.refresh_token.is_empty());
    }

    #[test]
    fn payload_uses_fixed_prices_and_joined_name() {
        let request = CreateClientRequest {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana@example.com".into(),
        };

        let payload = serde_json::to_value(CreateClientPayload::from(&request)).unwrap();
        assert_eq!(
            payload,
            json!({
                "client_data": { "full_name": "Ana Silva", "contact_email": "ana@example.com" },
                "client_role": { "will_price": 29999, "trust_price": 59999 }
            })
        );
    }

    #[test]
    fn profile_ids_accept_numbers_and_strings() {
        let envelope: UserDataEnvelope = serde_json::from_value(json!({
            "data": {
                "ud_id": 42,
                "professional_group_role_user_data": { "professional_group_id": "pg-7" }
            }
        }))
        .unwrap();

        let profile = UserProfile::from(envelope);
        assert_eq!(profile.subject_id.to_string(), "42");
        assert_eq!(profile.professional_group_id.to_string(), "pg-7");
    }
}
