use chrono::Utc;
use log::info;
use rocket::form::{self, Form};
use rocket::fs::TempFile;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;
use std::collections::HashSet;
use std::path::Path;

use crate::config::AppConfig;
use crate::db::{DbConnection, ReactionKind, Store};
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::models::{User, UserChanges};
use crate::users::CurrentUser;
use crate::utils::{discard_upload, relocate_upload, FlashView};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

impl From<User> for ProfileUser {
    fn from(user: User) -> Self {
        ProfileUser {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantView {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub category: String,
    pub is_commented: bool,
    pub is_favorited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub is_follower: bool,
    pub is_following: bool,
}

/// Everything the profile page shows. Counters describe the target user,
/// flags are relative to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: ProfileUser,
    pub login_id: Option<i32>,
    pub comment_count: usize,
    pub favorite_count: usize,
    pub follower_count: usize,
    pub following_count: usize,
    pub restaurants: Vec<RestaurantView>,
    pub users: Vec<UserView>,
}

/// The viewer's own relations, empty for anonymous visitors.
#[derive(Default)]
struct ViewerSets {
    commented: HashSet<i32>,
    favorited: HashSet<i32>,
    following: HashSet<i32>,
    followers: HashSet<i32>,
}

impl ViewerSets {
    fn load<S: Store + ?Sized>(store: &mut S, viewer_id: Option<i32>) -> ApiResult<ViewerSets> {
        let viewer_id = match viewer_id {
            Some(id) => id,
            None => return Ok(ViewerSets::default()),
        };
        Ok(ViewerSets {
            commented: store.commented_restaurant_ids(viewer_id)?.into_iter().collect(),
            favorited: store
                .reacted_restaurant_ids(ReactionKind::Favorite, viewer_id)?
                .into_iter()
                .collect(),
            following: store.following_ids(viewer_id)?.into_iter().collect(),
            followers: store.follower_ids(viewer_id)?.into_iter().collect(),
        })
    }
}

pub fn get_profile<S: Store + ?Sized>(
    store: &mut S,
    target_id: i32,
    viewer_id: Option<i32>,
) -> ApiResult<Profile> {
    let user = store
        .find_user(target_id)?
        .ok_or_else(|| ApiError::not_found("User didn't exist!"))?;

    let restaurants = store.restaurants_with_category()?;
    let all_users = store.all_users()?;
    let viewer = ViewerSets::load(store, viewer_id)?;

    let comment_count = store.commented_restaurant_ids(target_id)?.len();
    let favorite_count = store
        .reacted_restaurant_ids(ReactionKind::Favorite, target_id)?
        .len();
    let follower_count = store.follower_ids(target_id)?.len();
    let following_count = store.following_ids(target_id)?.len();

    let restaurants = restaurants
        .into_iter()
        .map(|(restaurant, category)| RestaurantView {
            is_commented: viewer.commented.contains(&restaurant.id),
            is_favorited: viewer.favorited.contains(&restaurant.id),
            id: restaurant.id,
            name: restaurant.name,
            image: restaurant.image,
            category: category.name,
        })
        .collect();
    let users = all_users
        .into_iter()
        .map(|other| UserView {
            is_follower: viewer.followers.contains(&other.id),
            is_following: viewer.following.contains(&other.id),
            id: other.id,
            name: other.name,
            image: other.image,
        })
        .collect();

    Ok(Profile {
        user: user.into(),
        login_id: viewer_id,
        comment_count,
        favorite_count,
        follower_count,
        following_count,
        restaurants,
        users,
    })
}

pub fn check_edit_permission(requester_id: i32, target_id: i32) -> ApiResult<()> {
    if requester_id != target_id {
        return Err(ApiError::forbidden("You can only edit your own profile!"));
    }
    Ok(())
}

pub struct ProfileUpdate {
    pub name: String,
    pub image: Option<String>,
}

impl Validate for ProfileUpdate {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        if self.name.trim().is_empty() {
            Err(ValidationError::from("name", "User name is required!"))
        } else {
            Ok(self)
        }
    }
}

/// Renames the user and, when a new image is given, replaces the image.
/// Without one the stored image stays.
pub fn update_profile<S: Store + ?Sized>(
    store: &mut S,
    requester_id: i32,
    target_id: i32,
    update: ProfileUpdate,
) -> ApiResult<User> {
    check_edit_permission(requester_id, target_id)?;
    let update = update.validate()?;
    if store.find_user(target_id)?.is_none() {
        return Err(ApiError::not_found("User didn't exist!"));
    }

    let changes = UserChanges {
        name: Some(update.name.trim().to_string()),
        image: update.image,
        updated_at: Some(Utc::now().naive_utc()),
    };
    let user = store.update_user(target_id, &changes)?;
    info!("user {} updated their profile", user.id);
    Ok(user)
}

#[derive(Debug, Serialize)]
struct ProfilePage {
    #[serde(flatten)]
    profile: Profile,
    flash: Option<FlashView>,
}

#[derive(Debug, Serialize)]
struct EditPage {
    user: ProfileUser,
    flash: Option<FlashView>,
}

#[derive(FromForm)]
pub struct EditForm<'r> {
    pub name: String,
    pub image: Option<TempFile<'r>>,
}

#[get("/users/<id>")]
pub fn profile(
    current_user: Option<CurrentUser>,
    mut connection: DbConnection,
    flash: Option<FlashMessage<'_>>,
    id: i32,
) -> ApiResult<Template> {
    let viewer_id = current_user.map(|user| user.id);
    let page = ProfilePage {
        profile: get_profile(&mut *connection, id, viewer_id)?,
        flash: FlashView::from_flash(flash),
    };
    Ok(Template::render("users/profile", &page))
}

#[get("/users/<id>/edit")]
pub fn edit(
    current_user: CurrentUser,
    mut connection: DbConnection,
    flash: Option<FlashMessage<'_>>,
    id: i32,
) -> ApiResult<Template> {
    check_edit_permission(current_user.id, id)?;
    let user = connection
        .find_user(id)?
        .ok_or_else(|| ApiError::not_found("User didn't exist!"))?;
    let page = EditPage {
        user: user.into(),
        flash: FlashView::from_flash(flash),
    };
    Ok(Template::render("users/edit", &page))
}

/// Stores the submitted image, then applies the edit. A stored image is
/// removed again when the edit fails.
pub async fn save_profile<S: Store + ?Sized>(
    store: &mut S,
    upload_dir: &Path,
    requester_id: i32,
    target_id: i32,
    mut form: EditForm<'_>,
) -> ApiResult<User> {
    check_edit_permission(requester_id, target_id)?;
    let update = ProfileUpdate {
        name: form.name,
        image: None,
    }
    .validate()?;

    let image = match form.image.as_mut() {
        Some(file) => relocate_upload(file, upload_dir, target_id).await?,
        None => None,
    };
    let stored = image.clone();

    match update_profile(store, requester_id, target_id, ProfileUpdate { image, ..update }) {
        Ok(user) => Ok(user),
        Err(err) => {
            if let Some(path) = stored {
                discard_upload(upload_dir, &path).await;
            }
            Err(err)
        }
    }
}

#[put("/users/<id>", data = "<form>")]
pub async fn put_user<'r>(
    current_user: CurrentUser,
    mut connection: DbConnection,
    config: &State<AppConfig>,
    id: i32,
    form: Form<form::Result<'r, EditForm<'r>>>,
) -> ApiResult<Flash<Redirect>> {
    let form = form.into_inner()?;
    let upload_dir = &config.upload_dir;
    let user = save_profile(&mut *connection, upload_dir, current_user.id, id, form).await?;
    Ok(Flash::success(
        Redirect::to(uri!(profile(user.id))),
        "Profile updated.",
    ))
}

// Multipart bodies cannot carry the `_method` override, so the edit form posts
// here instead of to the PUT route.
#[post("/users/<id>/edit", data = "<form>")]
pub async fn post_user<'r>(
    current_user: CurrentUser,
    connection: DbConnection,
    config: &State<AppConfig>,
    id: i32,
    form: Form<form::Result<'r, EditForm<'r>>>,
) -> ApiResult<Flash<Redirect>> {
    put_user(current_user, connection, config, id, form).await
}
