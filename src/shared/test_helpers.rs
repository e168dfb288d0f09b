#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
use fake::{faker::internet::en::SafeEmail, faker::name::en::Name, Fake};

#[cfg(test)]
use sqlx::PgPool;

#[cfg(test)]
pub fn create_reporter(principal_id: Option<i64>) -> AuthenticatedUser {
    AuthenticatedUser {
        sub: principal_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "external-subject".to_string()),
        principal_id,
        name: Some(Name().fake()),
        is_privileged: false,
    }
}

/// Wrap a router so every request carries `user` as if the auth middleware
/// had accepted its token
#[cfg(test)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                let response: Response = next.run(request).await;
                response
            }
        },
    ))
}

/// Insert an account row and return its id
#[cfg(test)]
pub async fn insert_user(pool: &PgPool, is_admin: bool, active: bool) -> i64 {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, is_admin, user_status) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(format!("{}-{}", uuid::Uuid::new_v4(), email))
    .bind(is_admin)
    .bind(if active { "active" } else { "inactive" })
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Id of a seeded category by name
#[cfg(test)]
pub async fn category_id(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Move an incident out of the editable window the way the approval
/// workflow does
#[cfg(test)]
pub async fn publish(pool: &PgPool, incident_id: i64) {
    sqlx::query(
        "UPDATE incidents SET status = 'published', is_published = TRUE WHERE id = $1",
    )
    .bind(incident_id)
    .execute(pool)
    .await
    .unwrap();
}
