use crate::backend::types::{Filter, ReadRequest, PROFILES_TABLE};
use crate::backend::Backend;
use crate::error::AppError;
use crate::models::{NewProfile, UserProfile};
use crate::query::decode_rows;
use crate::session::{Identity, SessionContext};
use serde_json::json;
use tracing::{error, info};

async fn find_profile(backend: &dyn Backend, user_id: &str) -> Result<Option<UserProfile>, AppError> {
    let request = ReadRequest::from_table(PROFILES_TABLE)
        .filter(Filter::eq("id", user_id))
        .limit(1);
    let rows = backend.select(&request).await.map_err(|e| {
        error!("Error loading profile: {}", e);
        AppError::query(e)
    })?;
    Ok(decode_rows(rows)?.into_iter().next())
}

async fn create_profile(backend: &dyn Backend, user: &Identity) -> Result<UserProfile, AppError> {
    let new_profile = NewProfile {
        id: user.user_id.clone(),
        email: user.email.clone(),
        full_name: user.metadata.full_name.clone().unwrap_or_default(),
        avatar_url: user.metadata.avatar_url.clone().unwrap_or_default(),
    };
    let row = serde_json::to_value(&new_profile)
        .map_err(|e| AppError::MutationFailure(e.to_string()))?;

    let stored = backend.insert(PROFILES_TABLE, row).await.map_err(|e| {
        error!("Error creating profile: {}", e);
        AppError::mutation(e)
    })?;
    info!("Created profile for {}", user.user_id);

    serde_json::from_value(stored).map_err(|e| AppError::MutationFailure(e.to_string()))
}

/// The signed-in user's profile, created from the identity on first load
pub async fn load_profile(
    backend: &dyn Backend,
    session: &SessionContext,
) -> Result<Option<UserProfile>, AppError> {
    let Some(user) = session.user() else {
        return Ok(None);
    };

    if let Some(profile) = find_profile(backend, &user.user_id).await? {
        return Ok(Some(profile));
    }
    create_profile(backend, user).await.map(Some)
}

pub async fn update_display_name(
    backend: &dyn Backend,
    session: &SessionContext,
    full_name: &str,
) -> Result<Option<UserProfile>, AppError> {
    let Some(user) = session.user() else {
        return Ok(None);
    };

    backend
        .update(
            PROFILES_TABLE,
            &[Filter::eq("id", user.user_id.as_str())],
            json!({ "full_name": full_name }),
        )
        .await
        .map_err(|e| {
            error!("Error updating profile: {}", e);
            AppError::mutation(e)
        })?;

    load_profile(backend, session).await
}
