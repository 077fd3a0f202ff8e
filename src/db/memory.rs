//! In-memory `Store` used by the service tests. It enforces the same
//! uniqueness constraints as the SQL schema.

use chrono::Utc;
use std::collections::BTreeSet;

use crate::db::{ReactionKind, Store};
use crate::restaurant::{Category, Restaurant};
use crate::social::Followship;
use crate::types::ApiError;
use crate::users::models::{NewUser, User, UserChanges};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Vec<User>,
    categories: Vec<Category>,
    restaurants: Vec<Restaurant>,
    // (user_id, restaurant_id), one entry per comment
    comments: Vec<(i32, i32)>,
    favorites: BTreeSet<(i32, i32)>,
    likes: BTreeSet<(i32, i32)>,
    followships: Vec<Followship>,
    next_followship_id: i32,
}

impl MemoryStore {
    pub fn insert_user(&mut self, name: &str) -> i32 {
        let now = Utc::now().naive_utc();
        let new_user = NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name),
            password: "not-a-hash".to_string(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        match self.create_user(&new_user) {
            Ok(user) => user.id,
            Err(e) => panic!("cannot insert user {}: {:?}", name, e),
        }
    }

    pub fn insert_category(&mut self, name: &str) -> i32 {
        let id = self.categories.len() as i32 + 1;
        self.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn insert_restaurant(&mut self, name: &str, category_id: i32) -> i32 {
        let id = self.restaurants.len() as i32 + 1;
        let now = Utc::now().naive_utc();
        self.restaurants.push(Restaurant {
            id,
            name: name.to_string(),
            tel: String::new(),
            address: String::new(),
            opening_hours: String::new(),
            description: String::new(),
            image: None,
            category_id,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn insert_comment(&mut self, user_id: i32, restaurant_id: i32) {
        self.comments.push((user_id, restaurant_id));
    }

    fn reactions(&mut self, kind: ReactionKind) -> &mut BTreeSet<(i32, i32)> {
        match kind {
            ReactionKind::Favorite => &mut self.favorites,
            ReactionKind::Like => &mut self.likes,
        }
    }
}

impl Store for MemoryStore {
    fn find_user(&mut self, user_id: i32) -> Result<Option<User>, ApiError> {
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.users.iter().find(|u| u.email == email).cloned())
    }

    fn create_user(&mut self, new_user: &NewUser) -> Result<User, ApiError> {
        if self.users.iter().any(|u| u.email == new_user.email) {
            return Err(ApiError::conflict("Already exists: users_email_key"));
        }
        let user = User {
            id: self.users.len() as i32 + 1,
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password: new_user.password.clone(),
            is_admin: new_user.is_admin,
            image: None,
            created_at: new_user.created_at,
            updated_at: new_user.updated_at,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn update_user(&mut self, user_id: i32, changes: &UserChanges) -> Result<User, ApiError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ApiError::not_found("Record didn't exist!"))?;
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(image) = &changes.image {
            user.image = Some(image.clone());
        }
        if let Some(updated_at) = changes.updated_at {
            user.updated_at = updated_at;
        }
        Ok(user.clone())
    }

    fn all_users(&mut self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.clone())
    }

    fn find_restaurant(&mut self, restaurant_id: i32) -> Result<Option<Restaurant>, ApiError> {
        Ok(self
            .restaurants
            .iter()
            .find(|r| r.id == restaurant_id)
            .cloned())
    }

    fn restaurants_with_category(&mut self) -> Result<Vec<(Restaurant, Category)>, ApiError> {
        let categories = &self.categories;
        Ok(self
            .restaurants
            .iter()
            .filter_map(|r| {
                categories
                    .iter()
                    .find(|c| c.id == r.category_id)
                    .map(|c| (r.clone(), c.clone()))
            })
            .collect())
    }

    fn commented_restaurant_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        let ids = self
            .comments
            .iter()
            .filter(|(author, _)| *author == user_id)
            .map(|(_, restaurant)| *restaurant)
            .collect::<BTreeSet<_>>();
        Ok(ids.into_iter().collect())
    }

    fn reaction_exists(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<bool, ApiError> {
        Ok(self.reactions(kind).contains(&(user_id, restaurant_id)))
    }

    fn add_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<(), ApiError> {
        if !self.reactions(kind).insert((user_id, restaurant_id)) {
            return Err(ApiError::conflict("Already exists: reaction"));
        }
        Ok(())
    }

    fn remove_reaction(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<usize, ApiError> {
        Ok(self.reactions(kind).remove(&(user_id, restaurant_id)) as usize)
    }

    fn reacted_restaurant_ids(
        &mut self,
        kind: ReactionKind,
        user_id: i32,
    ) -> Result<Vec<i32>, ApiError> {
        Ok(self
            .reactions(kind)
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, restaurant)| *restaurant)
            .collect())
    }

    fn followship_exists(
        &mut self,
        follower_id: i32,
        following_id: i32,
    ) -> Result<bool, ApiError> {
        Ok(self
            .followships
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    fn add_followship(&mut self, follower_id: i32, following_id: i32) -> Result<(), ApiError> {
        if self.followship_exists(follower_id, following_id)? {
            return Err(ApiError::conflict("Already exists: followship"));
        }
        self.next_followship_id += 1;
        self.followships.push(Followship {
            id: self.next_followship_id,
            follower_id,
            following_id,
            created_at: Utc::now().naive_utc(),
        });
        Ok(())
    }

    fn remove_followship(
        &mut self,
        follower_id: i32,
        following_id: i32,
    ) -> Result<usize, ApiError> {
        let before = self.followships.len();
        self.followships
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(before - self.followships.len())
    }

    fn following_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        Ok(self
            .followships
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }

    fn follower_ids(&mut self, user_id: i32) -> Result<Vec<i32>, ApiError> {
        Ok(self
            .followships
            .iter()
            .filter(|f| f.following_id == user_id)
            .map(|f| f.follower_id)
            .collect())
    }

    fn all_followships(&mut self) -> Result<Vec<Followship>, ApiError> {
        Ok(self.followships.clone())
    }
}
