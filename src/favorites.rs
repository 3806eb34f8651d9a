use crate::backend::types::{Filter, Order, ReadRequest, FAVORITES_TABLE, LISTINGS_TABLE};
use crate::backend::Backend;
use crate::error::AppError;
use crate::models::{FavoriteMark, Listing, NewFavorite};
use crate::query::{decode_rows, fetch_listings};
use crate::session::SessionContext;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Membership after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FavoriteState {
    Favorited,
    Unfavorited,
}

fn pair_filters(user_id: &str, listing_id: &str) -> Vec<Filter> {
    vec![
        Filter::eq("property_id", listing_id),
        Filter::eq("user_id", user_id),
    ]
}

/// Whether the signed-in user has favorited the listing.
/// Lookup failures read as "not favorited".
pub async fn is_favorite(backend: &dyn Backend, session: &SessionContext, listing_id: &str) -> bool {
    let Some(user) = session.user() else {
        return false;
    };

    let mut request = ReadRequest::from_table(FAVORITES_TABLE).limit(1);
    request.filters = pair_filters(&user.user_id, listing_id);

    match backend.select(&request).await {
        Ok(rows) => !rows.is_empty(),
        Err(e) => {
            warn!("Error checking favorite for {}: {}", listing_id, e);
            false
        }
    }
}

/// Flip the (user, listing) favorite. Without a signed-in user nothing happens.
pub async fn toggle_favorite(
    backend: &dyn Backend,
    session: &SessionContext,
    listing_id: &str,
) -> Result<Option<FavoriteState>, AppError> {
    let Some(user) = session.user() else {
        debug!("Favorite toggle skipped: no signed-in user");
        return Ok(None);
    };

    if is_favorite(backend, session, listing_id).await {
        let removed = backend
            .delete(FAVORITES_TABLE, &pair_filters(&user.user_id, listing_id))
            .await
            .map_err(|e| {
                error!("Error removing favorite: {}", e);
                AppError::mutation(e)
            })?;
        info!("Removed {} favorite mark(s) for {}", removed, listing_id);
        return Ok(Some(FavoriteState::Unfavorited));
    }

    let mark = NewFavorite {
        user_id: user.user_id.clone(),
        property_id: listing_id.to_string(),
    };
    let row = serde_json::to_value(&mark).map_err(|e| AppError::MutationFailure(e.to_string()))?;
    backend.insert(FAVORITES_TABLE, row).await.map_err(|e| {
        error!("Error adding favorite: {}", e);
        AppError::mutation(e)
    })?;

    info!("Favorited {}", listing_id);
    Ok(Some(FavoriteState::Favorited))
}

/// The signed-in user's favorited listings, in the order they were marked
pub async fn list_favorites(
    backend: &dyn Backend,
    session: &SessionContext,
) -> Result<Vec<Listing>, AppError> {
    let Some(user) = session.user() else {
        return Ok(Vec::new());
    };

    let request = ReadRequest::from_table(FAVORITES_TABLE)
        .filter(Filter::eq("user_id", user.user_id.as_str()))
        .order_by(Order::ascending("created_at"));
    let rows = backend.select(&request).await.map_err(|e| {
        error!("Error loading favorites: {}", e);
        AppError::query(e)
    })?;
    let marks: Vec<FavoriteMark> = decode_rows(rows)?;
    if marks.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<&str> = marks.iter().map(|m| m.property_id.as_str()).collect();
    let listing_request =
        ReadRequest::from_table(LISTINGS_TABLE).filter(Filter::is_in("id", ids.iter().copied()));
    let mut by_id: HashMap<String, Listing> = fetch_listings(backend, &listing_request)
        .await?
        .into_iter()
        .map(|listing| (listing.id.clone(), listing))
        .collect();

    let listings: Vec<Listing> = marks
        .iter()
        .filter_map(|mark| by_id.remove(&mark.property_id))
        .collect();
    debug!("{} favorites resolved to {} listings", marks.len(), listings.len());
    Ok(listings)
}
