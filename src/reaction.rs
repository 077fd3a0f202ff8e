use log::info;
use rocket::response::Redirect;

use crate::db::{DbConnection, ReactionKind, Store};
use crate::types::{ApiError, ApiResult};
use crate::users::CurrentUser;
use crate::utils::Back;

/// Marks `restaurant_id` for `user_id`. A second call for the same pair is a
/// conflict, never a silent success.
pub fn add<S: Store + ?Sized>(
    store: &mut S,
    kind: ReactionKind,
    user_id: i32,
    restaurant_id: i32,
) -> ApiResult<()> {
    if store.find_restaurant(restaurant_id)?.is_none() {
        return Err(ApiError::not_found("Restaurant didn't exist!"));
    }
    if store.reaction_exists(kind, user_id, restaurant_id)? {
        return Err(ApiError::conflict(format!(
            "You have {} this restaurant!",
            kind.noun()
        )));
    }
    store.add_reaction(kind, user_id, restaurant_id)?;
    info!("user {} {} restaurant {}", user_id, kind.noun(), restaurant_id);
    Ok(())
}

pub fn remove<S: Store + ?Sized>(
    store: &mut S,
    kind: ReactionKind,
    user_id: i32,
    restaurant_id: i32,
) -> ApiResult<()> {
    if store.remove_reaction(kind, user_id, restaurant_id)? == 0 {
        return Err(ApiError::not_found(format!(
            "You haven't {} this restaurant",
            kind.noun()
        )));
    }
    info!(
        "user {} no longer {} restaurant {}",
        user_id,
        kind.noun(),
        restaurant_id
    );
    Ok(())
}

#[post("/favorite/<restaurant_id>")]
pub fn add_favorite(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    restaurant_id: i32,
) -> ApiResult<Redirect> {
    add(&mut *connection, ReactionKind::Favorite, current_user.id, restaurant_id)?;
    Ok(back.redirect())
}

#[delete("/favorite/<restaurant_id>")]
pub fn remove_favorite(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    restaurant_id: i32,
) -> ApiResult<Redirect> {
    remove(&mut *connection, ReactionKind::Favorite, current_user.id, restaurant_id)?;
    Ok(back.redirect())
}

#[post("/like/<restaurant_id>")]
pub fn add_like(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    restaurant_id: i32,
) -> ApiResult<Redirect> {
    add(&mut *connection, ReactionKind::Like, current_user.id, restaurant_id)?;
    Ok(back.redirect())
}

#[delete("/like/<restaurant_id>")]
pub fn remove_like(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    restaurant_id: i32,
) -> ApiResult<Redirect> {
    remove(&mut *connection, ReactionKind::Like, current_user.id, restaurant_id)?;
    Ok(back.redirect())
}
