use chrono::Utc;

use crate::database::Database;
use crate::error::Error;

use super::{token, Claims, Credentials, Principal, UserId};

pub const ADMIN_NAME: &str = "admin";

#[tracing::instrument(skip(db))]
pub async fn authenticate(db: &dyn Database, credentials: &Credentials) -> Result<Principal, Error> {
    let token = credentials.token().ok_or(Error::Unauthenticated)?;

    let principal = db
        .principals()
        .fetch_principal_by_token_hash(&token::hash_token(token))
        .await?
        .ok_or(Error::Unauthenticated)?;

    Ok(principal)
}

#[tracing::instrument(skip(db))]
pub async fn require_admin(db: &dyn Database, credentials: &Credentials) -> Result<Principal, Error> {
    let principal = authenticate(db, credentials).await?;

    if !principal.claims.is_admin() {
        return Err(Error::PermissionDenied {
            user_id: principal.id,
        });
    }

    Ok(principal)
}

/// Makes `token` the admin credential, replacing any previous admin token.
#[tracing::instrument(skip(db, token))]
pub async fn ensure_admin_principal(db: &dyn Database, token: &str) -> Result<Principal, Error> {
    let principal = Principal {
        id: UserId::new(),
        name: ADMIN_NAME.to_string(),
        token_hash: token::hash_token(token),
        claims: Claims {
            admin: true,
            role: Some("superadmin".to_string()),
        },
        created_at: Utc::now(),
    };

    db.principals().upsert_principal(&principal).await?;

    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test::{sample_principal, MockDatabase};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn authenticate_requires_a_token() {
        let db = MockDatabase::new();

        let result = authenticate(&db, &Credentials::anonymous()).await;

        assert_eq!(result.unwrap_err(), Error::Unauthenticated);
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_tokens() {
        let db = MockDatabase::new().with_principal(sample_principal("known", Claims::default()));

        let result = authenticate(&db, &Credentials::bearer("unknown")).await;

        assert_eq!(result.unwrap_err(), Error::Unauthenticated);
    }

    #[tokio::test]
    async fn require_admin_rejects_plain_principals() {
        let principal = sample_principal("staff", Claims::default());
        let user_id = principal.id;
        let db = MockDatabase::new().with_principal(principal);

        let result = require_admin(&db, &Credentials::bearer("staff")).await;

        assert_eq!(result.unwrap_err(), Error::PermissionDenied { user_id });
    }

    #[tokio::test]
    async fn require_admin_accepts_admin_flag() {
        let principal = sample_principal(
            "boss",
            Claims {
                admin: true,
                role: None,
            },
        );
        let db = MockDatabase::new().with_principal(principal.clone());

        let result = require_admin(&db, &Credentials::bearer("boss")).await;

        assert_eq!(result.unwrap(), principal);
    }

    #[tokio::test]
    async fn ensure_admin_principal_stores_hashed_token() {
        let mut db = MockDatabase::new();
        let upserted = Arc::new(Mutex::new(None));
        let upserted_clone = Arc::clone(&upserted);
        db.principals.on_upsert_principal = Box::new(move |principal| {
            *upserted_clone.lock().unwrap() = Some(principal.clone());
            Ok(())
        });

        let principal = ensure_admin_principal(&db, "root-token").await.unwrap();

        assert_eq!(principal.token_hash, token::hash_token("root-token"));
        assert!(principal.claims.is_admin());
        assert_eq!(*upserted.lock().unwrap(), Some(principal));
    }
}
