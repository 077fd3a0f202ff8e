use chrono::Utc;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::{delete, insert_into, select, update};

use crate::db::schema::{categories, comments, followships, restaurants, users};
use crate::restaurant::{Category, Restaurant};
use crate::social::Followship;
use crate::types::ApiError;
use crate::users::models::{NewUser, User, UserChanges};

/// The two user → restaurant marker relations. Both share one contract and
/// differ only in the table they live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Favorite,
    Like,
}

impl ReactionKind {
    pub fn noun(self) -> &'static str {
        match self {
            ReactionKind::Favorite => "favorited",
            ReactionKind::Like => "liked",
        }
    }
}

/// Everything the services need from persistence, as plain records.
///
/// Implemented by `PgConnection` for the running server; tests use the
/// in-memory store from `db::memory`.
pub trait Store {
    fn find_user(&mut self, user_id: i32) -> Result<Option<User>, ApiError>;
    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, ApiError>;
    fn create_user(&mut self, new_user: &NewUser) -> Result<User, ApiError>;
    fn update_user(&mut self, user_id: i32, changes: &UserChanges) -> Result<User, ApiError>;
    fn all_users(&mut self) -> Result<Vec<User>, ApiError>;

    fn find_restaurant(&mut self, restaurant_id: i32) -> Result<Option<Restaurant>, ApiError>;
    fn restaurants_with_category(&mut self) -> Result<Vec<(Restaurant, Category)>, ApiError>;
    /// Distinct ids of the restaurants `user_id` has commented on.
    fn commented_restaurant_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError>;

    fn reaction_exists(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<bool, ApiError>;
    fn add_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<(), ApiError>;
    /// Returns the number of removed rows.
    fn remove_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<usize, ApiError>;
    fn reacted_restaurant_ids(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
    ) -> Result<Vec<i32>, ApiError>;

    fn followship_exists(&mut self, follower_id: i32, following_id: i32)
        -> Result<bool, ApiError>;
    fn add_followship(&mut self, follower_id: i32, following_id: i32) -> Result<(), ApiError>;
    fn remove_followship(&mut self, follower_id: i32, following_id: i32)
        -> Result<usize, ApiError>;
    /// Ids of the users `user_id` follows.
    fn following_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError>;
    /// Ids of the users following `user_id`.
    fn follower_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError>;
    fn all_followships(&mut self) -> Result<Vec<Followship>, ApiError>;
}

// favorites and likes have identical columns, so one body serves both tables.
macro_rules! on_reaction_table {
    ($kind:expr, $table:ident => $body:expr) => {
        match $kind {
            ReactionKind::Favorite => {
                use crate::db::schema::favorites as $table;
                $body
            }
            ReactionKind::Like => {
                use crate::db::schema::likes as $table;
                $body
            }
        }
    };
}

impl Store for PgConnection {
    fn find_user(&mut self, user_id: i32) -> Result<Option<User>, ApiError> {
        users::table
            .find(user_id)
            .select(User::as_select())
            .first(self)
            .optional()
            .map_err(|e| e.into())
    }

    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, ApiError> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(self)
            .optional()
            .map_err(|e| e.into())
    }

    fn create_user(&mut self, new_user: &NewUser) -> Result<User, ApiError> {
        let user = insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(self)?;
        Ok(user)
    }

    fn update_user(&mut self, user_id: i32, changes: &UserChanges) -> Result<User, ApiError> {
        let user = update(users::table.find(user_id))
            .set(changes)
            .returning(User::as_returning())
            .get_result(self)?;
        Ok(user)
    }

    fn all_users(&mut self) -> Result<Vec<User>, ApiError> {
        let all = users::table
            .order(users::id.asc())
            .select(User::as_select())
            .load(self)?;
        Ok(all)
    }

    fn find_restaurant(&mut self, restaurant_id: i32) -> Result<Option<Restaurant>, ApiError> {
        restaurants::table
            .find(restaurant_id)
            .select(Restaurant::as_select())
            .first(self)
            .optional()
            .map_err(|e| e.into())
    }

    fn restaurants_with_category(&mut self) -> Result<Vec<(Restaurant, Category)>, ApiError> {
        let rows = restaurants::table
            .inner_join(categories::table)
            .order(restaurants::id.asc())
            .select((Restaurant::as_select(), Category::as_select()))
            .load::<(Restaurant, Category)>(self)?;
        Ok(rows)
    }

    fn commented_restaurant_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        let ids = comments::table
            .filter(comments::user_id.eq(user_id))
            .select(comments::restaurant_id)
            .distinct()
            .load::<i32>(self)?;
        Ok(ids)
    }

    fn reaction_exists(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<bool, ApiError> {
        let found = on_reaction_table!(kind, reactions => select(exists(
            reactions::table
                .filter(reactions::user_id.eq(user_id))
                .filter(reactions::restaurant_id.eq(restaurant_id)),
        ))
        .get_result::<bool>(self)?);
        Ok(found)
    }

    fn add_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<(), ApiError> {
        on_reaction_table!(kind, reactions => insert_into(reactions::table)
            .values((
                reactions::user_id.eq(user_id),
                reactions::restaurant_id.eq(restaurant_id),
                reactions::created_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self)?);
        Ok(())
    }

    fn remove_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<usize, ApiError> {
        let removed = on_reaction_table!(kind, reactions => delete(
            reactions::table
                .filter(reactions::user_id.eq(user_id))
                .filter(reactions::restaurant_id.eq(restaurant_id)),
        )
        .execute(self)?);
        Ok(removed)
    }

    fn reacted_restaurant_ids(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
    ) -> Result<Vec<i32>, ApiError> {
        let ids = on_reaction_table!(kind, reactions => reactions::table
            .filter(reactions::user_id.eq(user_id))
            .select(reactions::restaurant_id)
            .load::<i32>(self)?);
        Ok(ids)
    }

    fn followship_exists(
        &mut self,
        follower_id: i32,
        following_id: i32,
    ) -> Result<bool, ApiError> {
        let found = select(exists(
            followships::table
                .filter(followships::follower_id.eq(follower_id))
                .filter(followships::following_id.eq(following_id)),
        ))
        .get_result::<bool>(self)?;
        Ok(found)
    }

    fn add_followship(&mut self, follower_id: i32, following_id: i32) -> Result<(), ApiError> {
        insert_into(followships::table)
            .values((
                followships::follower_id.eq(follower_id),
                followships::following_id.eq(following_id),
                followships::created_at.eq(Utc::now().naive_utc()),
            ))
            .execute(self)?;
        Ok(())
    }

    fn remove_followship(
        &mut self,
        follower_id: i32,
        following_id: i32,
    ) -> Result<usize, ApiError> {
        let removed = delete(
            followships::table
                .filter(followships::follower_id.eq(follower_id))
                .filter(followships::following_id.eq(following_id)),
        )
        .execute(self)?;
        Ok(removed)
    }

    fn following_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        let ids = followships::table
            .filter(followships::follower_id.eq(user_id))
            .select(followships::following_id)
            .load::<i32>(self)?;
        Ok(ids)
    }

    fn follower_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        let ids = followships::table
            .filter(followships::following_id.eq(user_id))
            .select(followships::follower_id)
            .load::<i32>(self)?;
        Ok(ids)
    }

    fn all_followships(&mut self) -> Result<Vec<Followship>, ApiError> {
        let edges = followships::table
            .select(Followship::as_select())
            .load(self)?;
        Ok(edges)
    }
}
