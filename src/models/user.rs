use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

/// A user row as seen by the reservation core: enough to match a webhook
/// payload's email back to an account. Account management lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl DirectoryUser {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        format!("{first} {last}").trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActorRole {
    Admin,
    Customer,
}

/// The authenticated principal for the current request.
///
/// Identity is established upstream (session/JWT middleware) and forwarded as
/// trusted `x-actor-*` headers; the core never re-authenticates.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
const ACTOR_NAME_HEADER: &str = "x-actor-name";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::AuthError(format!("Missing identity header '{name}'")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError("Malformed actor id".to_string()))?;
        let email = header_value(parts, ACTOR_EMAIL_HEADER)?.to_string();
        let name = header_value(parts, ACTOR_NAME_HEADER)?.to_string();
        let role = match header_value(parts, ACTOR_ROLE_HEADER)? {
            "ADMIN" => ActorRole::Admin,
            _ => ActorRole::Customer,
        };

        Ok(Actor {
            id,
            email,
            name,
            role,
        })
    }
}
