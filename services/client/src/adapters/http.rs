//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, the concrete implementation of the
//! `AuthApi` and `IndividualsApi` ports from the `core` crate. It talks JSON to the
//! remote genealogy API using `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use family_tree_core::domain::{
    Individual, IndividualId, IndividualPatch, Registration, Sex, TokenGrant, User,
};
use family_tree_core::ports::{AuthApi, IndividualsApi, PortError, PortResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::Config;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the remote API ports over HTTP.
#[derive(Clone)]
pub struct HttpApiAdapter {
    client: Client,
    base_url: String,
}

impl HttpApiAdapter {
    /// Creates a new `HttpApiAdapter` from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and turns any non-success status into a `PortError`.
    async fn send(&self, request: RequestBuilder, what: &str) -> PortResult<Response> {
        let response = request.send().await.map_err(|e| {
            error!("{} failed in transit: {}", what, e);
            PortError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("{} succeeded with status {}", what, status);
            return Ok(response);
        }

        warn!("{} rejected with status {}", what, status);
        Err(match status {
            StatusCode::UNAUTHORIZED => PortError::Unauthorized,
            StatusCode::NOT_FOUND => PortError::NotFound(what.to_string()),
            other => PortError::Rejected {
                status: other.as_u16(),
            },
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Decode(e.to_string()))
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenRecord {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenRecord {
    fn to_domain(self) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
        }
    }
}

#[derive(Deserialize)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    is_active: bool,
    created_at: String,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            is_active: self.is_active,
            created_at: parse_timestamp("created_at", &self.created_at)?,
        })
    }
}

#[derive(Deserialize)]
struct RegistrationRecord {
    #[serde(flatten)]
    user: UserRecord,
    api_key: String,
}

impl RegistrationRecord {
    fn to_domain(self) -> PortResult<Registration> {
        Ok(Registration {
            user: self.user.to_domain()?,
            api_key: self.api_key,
        })
    }
}

#[derive(Deserialize)]
struct IndividualRecord {
    id: String,
    user_id: Uuid,
    gedcom_id: String,
    #[serde(default)]
    given_names: Option<String>,
    #[serde(default)]
    surname: Option<String>,
    #[serde(default)]
    sex: Option<String>,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
    #[serde(default)]
    birth_place: Option<String>,
    #[serde(default)]
    death_date: Option<NaiveDate>,
    #[serde(default)]
    death_place: Option<String>,
    #[serde(default)]
    note: Option<String>,
    created_at: String,
    updated_at: String,
}

impl IndividualRecord {
    fn to_domain(self) -> PortResult<Individual> {
        let sex = match self.sex.as_deref() {
            Some(code) => {
                let parsed = Sex::from_code(code);
                if parsed.is_none() {
                    warn!("Ignoring unknown sex code '{}' on individual {}", code, self.id);
                }
                parsed
            }
            None => None,
        };
        Ok(Individual {
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: IndividualId::new(self.id),
            user_id: self.user_id,
            gedcom_id: self.gedcom_id,
            given_names: self.given_names,
            surname: self.surname,
            sex,
            birth_date: self.birth_date,
            birth_place: self.birth_place,
            death_date: self.death_date,
            death_place: self.death_place,
            note: self.note,
        })
    }
}

/// The JSON body of a create or update call; unset fields are omitted entirely.
#[derive(Serialize)]
struct IndividualPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    gedcom_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    given_names: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    surname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sex: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_place: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    death_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    death_place: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

impl<'a> From<&'a IndividualPatch> for IndividualPayload<'a> {
    fn from(patch: &'a IndividualPatch) -> Self {
        Self {
            gedcom_id: patch.gedcom_id.as_deref(),
            given_names: patch.given_names.as_deref(),
            surname: patch.surname.as_deref(),
            sex: patch.sex.map(|sex| sex.code()),
            birth_date: patch.birth_date,
            birth_place: patch.birth_place.as_deref(),
            death_date: patch.death_date,
            death_place: patch.death_place.as_deref(),
            note: patch.note.as_deref(),
        }
    }
}

/// Accepts RFC 3339 timestamps and naive ISO-8601 ones, which are taken as UTC.
fn parse_timestamp(field: &str, raw: &str) -> PortResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| PortError::Decode(format!("{} '{}': {}", field, raw, e)))
}

//=========================================================================================
// `AuthApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthApi for HttpApiAdapter {
    async fn login(&self, username: &str, password: &str) -> PortResult<TokenGrant> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginBody { username, password });
        let response = self.send(request, "Login").await?;
        let record: TokenRecord = decode(response).await?;
        Ok(record.to_domain())
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> PortResult<Registration> {
        let request = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterBody {
                username,
                email,
                password,
            });
        let response = self.send(request, "Registration").await?;
        let record: RegistrationRecord = decode(response).await?;
        record.to_domain()
    }

    async fn current_user(&self, token: &str) -> PortResult<User> {
        let request = self.client.get(self.url("/api/auth/me")).bearer_auth(token);
        let response = self.send(request, "Profile lookup").await?;
        let record: UserRecord = decode(response).await?;
        record.to_domain()
    }

    async fn regenerate_api_key(&self, token: &str) -> PortResult<Registration> {
        let request = self
            .client
            .post(self.url("/api/auth/regenerate-api-key"))
            .bearer_auth(token);
        let response = self.send(request, "API key rotation").await?;
        let record: RegistrationRecord = decode(response).await?;
        record.to_domain()
    }
}

//=========================================================================================
// `IndividualsApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl IndividualsApi for HttpApiAdapter {
    async fn list_individuals(&self, token: &str) -> PortResult<Vec<Individual>> {
        let request = self
            .client
            .get(self.url("/api/individuals"))
            .bearer_auth(token);
        let response = self.send(request, "Individual listing").await?;
        let records: Vec<IndividualRecord> = decode(response).await?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_individual(
        &self,
        token: &str,
        patch: &IndividualPatch,
    ) -> PortResult<Individual> {
        let request = self
            .client
            .post(self.url("/api/individuals"))
            .bearer_auth(token)
            .json(&IndividualPayload::from(patch));
        let response = self.send(request, "Individual creation").await?;
        let record: IndividualRecord = decode(response).await?;
        record.to_domain()
    }

    async fn update_individual(
        &self,
        token: &str,
        id: &IndividualId,
        patch: &IndividualPatch,
    ) -> PortResult<Individual> {
        let request = self
            .client
            .put(self.url(&format!("/api/individuals/{}", id)))
            .bearer_auth(token)
            .json(&IndividualPayload::from(patch));
        let response = self.send(request, "Individual update").await?;
        let record: IndividualRecord = decode(response).await?;
        record.to_domain()
    }

    async fn delete_individual(&self, token: &str, id: &IndividualId) -> PortResult<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/individuals/{}", id)))
            .bearer_auth(token);
        self.send(request, "Individual deletion").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_naive_and_rfc3339_timestamps() {
        let naive = parse_timestamp("created_at", "2024-03-01T10:20:30.123456").unwrap();
        let zoned = parse_timestamp("created_at", "2024-03-01T10:20:30.123456Z").unwrap();
        assert_eq!(naive, zoned);
        assert!(parse_timestamp("created_at", "2024-03-01T10:20:30").is_ok());
        assert!(matches!(
            parse_timestamp("created_at", "yesterday"),
            Err(PortError::Decode(_))
        ));
    }

    #[test]
    fn test_payload_omits_unset_fields() {
        let patch = IndividualPatch {
            surname: Some("Lovelace".to_string()),
            sex: Some(Sex::Female),
            ..Default::default()
        };
        let json = serde_json::to_value(IndividualPayload::from(&patch)).unwrap();
        assert_eq!(json, serde_json::json!({ "surname": "Lovelace", "sex": "F" }));
    }

    #[test]
    fn test_individual_record_to_domain() {
        let record: IndividualRecord = serde_json::from_value(serde_json::json!({
            "id": "1",
            "user_id": "6f1c1f5e-3b3a-4d59-9d4e-1f2f5c7b9a10",
            "gedcom_id": "@I1@",
            "given_names": "Ada",
            "surname": "Lovelace",
            "sex": "f",
            "birth_date": "1815-12-10",
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00"
        }))
        .unwrap();
        let individual = record.to_domain().unwrap();
        assert_eq!(individual.id.as_str(), "1");
        assert_eq!(individual.sex, Some(Sex::Female));
        assert_eq!(individual.birth_date, NaiveDate::from_ymd_opt(1815, 12, 10));
        assert!(individual.death_date.is_none());
    }
}
