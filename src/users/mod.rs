use chrono::Utc;
use log::info;
use rocket::form::{self, Form};
use rocket::http::{CookieJar, Status};
use rocket::request::{self, FlashMessage, FromRequest, Outcome, Request};
use rocket::response::{Flash, Redirect};
use rocket_dyn_templates::Template;

use crate::db::{DbConnection, Store};
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::utils::FlashView;

pub mod models;
mod utils;

use self::models::{NewUser, User};
use self::utils::*;

pub const SESSION_COOKIE: &str = "user_id";

/// The signed-in user, read from the private session cookie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser {
    pub id: i32,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let user_id = request
            .cookies()
            .get_private(SESSION_COOKIE)
            .and_then(|cookie| cookie.value().parse::<i32>().ok());
        match user_id {
            Some(id) => Outcome::Success(CurrentUser { id }),
            None => Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[field(name = "passwordCheck")]
    pub password_check: String,
}

impl Validate for Registration {
    type Error = ValidationError;
    fn validate(self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        if let Err(e) = validate_name(&self.name) {
            errors.merge(e);
        }
        if let Err(e) = validate_email_re(&self.email) {
            errors.merge(e);
        }
        if let Err(e) = validate_password_confirmation(&self.password, &self.password_check) {
            errors.merge(e);
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, FromForm)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Creates an account. Form errors are reported before the duplicate e-mail
/// check.
pub fn register<S: Store + ?Sized>(store: &mut S, registration: Registration) -> ApiResult<User> {
    let registration = registration.validate()?;

    if store.find_user_by_email(&registration.email)?.is_some() {
        return Err(ApiError::conflict("Email already exists!"));
    }

    let now = Utc::now().naive_utc();
    let new_user = NewUser {
        name: registration.name.trim().to_string(),
        email: registration.email,
        password: User::make_password(&registration.password)?,
        is_admin: false,
        created_at: now,
        updated_at: now,
    };
    let user = store.create_user(&new_user)?;
    info!("registered user {} <{}>", user.id, user.email);
    Ok(user)
}

pub fn authenticate<S: Store + ?Sized>(store: &mut S, login: &Login) -> ApiResult<User> {
    let invalid = || {
        ApiError::from(ValidationError::from("password", "Incorrect email or password"))
    };
    let user = match store.find_user_by_email(&login.email)? {
        Some(user) => user,
        None => return Err(invalid()),
    };
    if user.verify_password(&login.password)? {
        Ok(user)
    } else {
        Err(invalid())
    }
}

#[derive(Debug, Serialize)]
struct AuthPage {
    flash: Option<FlashView>,
}

#[get("/signup")]
pub fn signup_page(flash: Option<FlashMessage<'_>>) -> Template {
    let page = AuthPage {
        flash: FlashView::from_flash(flash),
    };
    Template::render("signup", &page)
}

#[post("/signup", data = "<registration>")]
pub fn signup(
    mut connection: DbConnection,
    registration: Form<form::Result<'_, Registration>>,
) -> ApiResult<Flash<Redirect>> {
    register(&mut *connection, registration.into_inner()?)?;
    Ok(Flash::success(
        Redirect::to(uri!(signin_page)),
        "Account created, please sign in.",
    ))
}

#[get("/signin")]
pub fn signin_page(flash: Option<FlashMessage<'_>>) -> Template {
    let page = AuthPage {
        flash: FlashView::from_flash(flash),
    };
    Template::render("signin", &page)
}

#[post("/signin", data = "<login>")]
pub fn signin(
    mut connection: DbConnection,
    cookies: &CookieJar<'_>,
    login: Form<form::Result<'_, Login>>,
) -> ApiResult<Flash<Redirect>> {
    let login = login.into_inner()?;
    let user = authenticate(&mut *connection, &login)?;
    cookies.add_private((SESSION_COOKIE, user.id.to_string()));
    info!("user {} signed in", user.id);
    Ok(Flash::success(
        Redirect::to(uri!(crate::social::top_users)),
        "Signed in successfully.",
    ))
}

#[get("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Flash<Redirect> {
    cookies.remove_private(SESSION_COOKIE);
    Flash::success(Redirect::to(uri!(signin_page)), "Signed out successfully.")
}
