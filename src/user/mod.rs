use std::fmt::{self, Debug};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod manager;
pub mod token;

pub type UserId = TypedId<Principal>;

/// Roles that carry admin privileges on their own.
const ADMIN_ROLES: [&str; 2] = ["admin", "superadmin"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.admin
            || self
                .role
                .as_deref()
                .map_or(false, |role| ADMIN_ROLES.contains(&role))
    }
}

/// A caller known to the service by the hash of its bearer token.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Principal {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub token_hash: String,
    #[serde(default)]
    pub claims: Claims,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for Principal {
    fn tag() -> &'static str {
        "USR"
    }
}

/// The bearer token of a request, if one was given.
#[derive(Clone, Default)]
pub struct Credentials(Option<String>);

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Credentials {
        Credentials(Some(token.into()))
    }

    pub fn anonymous() -> Credentials {
        Credentials(None)
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn from_header(value: &str) -> Credentials {
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Credentials(token)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credentials(<redacted>)"),
            None => f.write_str("Credentials(None)"),
        }
    }
}

impl FromRequest for Credentials {
    type Error = Error;
    type Future = Ready<Result<Credentials, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let credentials = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(Credentials::from_header)
            .unwrap_or_default();

        ready(Ok(credentials))
    }
}
