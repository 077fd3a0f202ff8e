use chrono::NaiveDateTime;
use diesel::prelude::*;
use log::info;
use rocket::request::FlashMessage;
use rocket::response::Redirect;
use rocket_dyn_templates::Template;
use std::collections::{HashMap, HashSet};

use crate::db::schema::followships;
use crate::db::{DbConnection, Store};
use crate::types::{ApiError, ApiResult, ValidationError};
use crate::users::CurrentUser;
use crate::utils::{Back, FlashView};

/// Directed edge: `follower_id` follows `following_id`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = followships, check_for_backend(diesel::pg::Pg))]
pub struct Followship {
    pub id: i32,
    pub follower_id: i32,
    pub following_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub follower_count: usize,
    pub is_followed: bool,
    pub is_self: bool,
}

pub fn follow<S: Store + ?Sized>(store: &mut S, follower_id: i32, target_id: i32) -> ApiResult<()> {
    if follower_id == target_id {
        return Err(ValidationError::from("followingId", "You cannot follow yourself!").into());
    }
    if store.find_user(target_id)?.is_none() {
        return Err(ApiError::not_found("User didn't exist!"));
    }
    if store.followship_exists(follower_id, target_id)? {
        return Err(ApiError::conflict("You are already following this user!"));
    }
    store.add_followship(follower_id, target_id)?;
    info!("user {} now follows user {}", follower_id, target_id);
    Ok(())
}

pub fn unfollow<S: Store + ?Sized>(
    store: &mut S,
    follower_id: i32,
    target_id: i32,
) -> ApiResult<()> {
    if store.remove_followship(follower_id, target_id)? == 0 {
        return Err(ApiError::not_found("You haven't followed this user!"));
    }
    info!("user {} unfollowed user {}", follower_id, target_id);
    Ok(())
}

/// Every user with their follower count, most followed first. Equal counts
/// are ordered by ascending id.
pub fn rank_users_by_followers<S: Store + ?Sized>(
    store: &mut S,
    viewer_id: i32,
) -> ApiResult<Vec<RankedUser>> {
    let users = store.all_users()?;
    let edges = store.all_followships()?;

    let mut follower_counts: HashMap<i32, usize> = HashMap::new();
    let mut followed_by_viewer = HashSet::new();
    for edge in &edges {
        *follower_counts.entry(edge.following_id).or_default() += 1;
        if edge.follower_id == viewer_id {
            followed_by_viewer.insert(edge.following_id);
        }
    }

    let mut ranked = users
        .into_iter()
        .map(|user| RankedUser {
            follower_count: follower_counts.get(&user.id).cloned().unwrap_or(0),
            is_followed: followed_by_viewer.contains(&user.id),
            is_self: user.id == viewer_id,
            id: user.id,
            name: user.name,
            image: user.image,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        b.follower_count
            .cmp(&a.follower_count)
            .then(a.id.cmp(&b.id))
    });
    Ok(ranked)
}

#[derive(Debug, Serialize)]
struct TopUsersPage {
    users: Vec<RankedUser>,
    flash: Option<FlashView>,
}

#[get("/users/top")]
pub fn top_users(
    current_user: CurrentUser,
    mut connection: DbConnection,
    flash: Option<FlashMessage<'_>>,
) -> ApiResult<Template> {
    let page = TopUsersPage {
        users: rank_users_by_followers(&mut *connection, current_user.id)?,
        flash: FlashView::from_flash(flash),
    };
    Ok(Template::render("top-users", &page))
}

#[post("/following/<user_id>")]
pub fn add_following(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    user_id: i32,
) -> ApiResult<Redirect> {
    follow(&mut *connection, current_user.id, user_id)?;
    Ok(back.redirect())
}

#[delete("/following/<user_id>")]
pub fn remove_following(
    current_user: CurrentUser,
    mut connection: DbConnection,
    back: Back,
    user_id: i32,
) -> ApiResult<Redirect> {
    unfollow(&mut *connection, current_user.id, user_id)?;
    Ok(back.redirect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn store_with_users(count: usize) -> MemoryStore {
        let mut store = MemoryStore::default();
        for n in 1..=count {
            store.insert_user(&format!("user{}", n));
        }
        store
    }

    #[test]
    fn follow_then_unfollow_restores_state() {
        let mut store = store_with_users(2);
        assert!(!store.followship_exists(1, 2).unwrap());

        follow(&mut store, 1, 2).unwrap();
        assert!(store.followship_exists(1, 2).unwrap());
        assert!(!store.followship_exists(2, 1).unwrap());

        unfollow(&mut store, 1, 2).unwrap();
        assert!(!store.followship_exists(1, 2).unwrap());
    }

    #[test]
    fn following_twice_is_a_conflict() {
        let mut store = store_with_users(2);
        follow(&mut store, 1, 2).unwrap();
        assert!(matches!(follow(&mut store, 1, 2), Err(ApiError::Conflict(_))));
        assert_eq!(store.all_followships().unwrap().len(), 1);
    }

    #[test]
    fn unfollowing_a_stranger_is_not_found() {
        let mut store = store_with_users(2);
        assert!(matches!(unfollow(&mut store, 1, 2), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn self_follow_is_rejected() {
        let mut store = store_with_users(1);
        assert!(matches!(follow(&mut store, 1, 1), Err(ApiError::Validation(_))));
        assert!(store.all_followships().unwrap().is_empty());
    }

    #[test]
    fn following_a_missing_user_is_not_found() {
        let mut store = store_with_users(1);
        assert!(matches!(follow(&mut store, 1, 9), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn ranking_orders_by_followers_then_id() {
        let mut store = store_with_users(4);
        // user3: 2 followers, user2 and user4: 1 each, user1: none
        follow(&mut store, 1, 3).unwrap();
        follow(&mut store, 2, 3).unwrap();
        follow(&mut store, 1, 4).unwrap();
        follow(&mut store, 3, 2).unwrap();

        let ranked = rank_users_by_followers(&mut store, 1).unwrap();
        let ids = ranked.iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 2, 4, 1]);

        for pair in ranked.windows(2) {
            assert!(pair[0].follower_count >= pair[1].follower_count);
        }

        let followed = ranked
            .iter()
            .filter(|u| u.is_followed)
            .map(|u| u.id)
            .collect::<Vec<_>>();
        assert_eq!(followed, vec![3, 4]);
    }

    #[test]
    fn exactly_the_viewer_is_self() {
        let mut store = store_with_users(3);
        follow(&mut store, 2, 1).unwrap();

        let ranked = rank_users_by_followers(&mut store, 2).unwrap();
        let selves = ranked.iter().filter(|u| u.is_self).collect::<Vec<_>>();
        assert_eq!(selves.len(), 1);
        assert_eq!(selves[0].id, 2);
        assert!(!selves[0].is_followed);
    }
}
