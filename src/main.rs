#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

mod config;
mod db;
mod profile;
mod reaction;
mod restaurant;
mod social;
mod types;
mod users;
mod utils;

use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::response::{Flash, Redirect};
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

use config::AppConfig;

#[derive(Serialize)]
struct ErrorPage {
    status: u16,
    reason: &'static str,
}

#[catch(401)]
fn unauthorized() -> Flash<Redirect> {
    Flash::error(Redirect::to(uri!(users::signin_page)), "Please sign in first.")
}

#[catch(404)]
fn not_found() -> Template {
    Template::render(
        "error",
        &ErrorPage {
            status: 404,
            reason: "Page not found",
        },
    )
}

#[catch(default)]
fn server_error(status: rocket::http::Status, _req: &Request) -> Template {
    Template::render(
        "error",
        &ErrorPage {
            status: status.code,
            reason: status.reason().unwrap_or("Something went wrong"),
        },
    )
}

#[get("/")]
fn index() -> Redirect {
    Redirect::to(uri!(social::top_users))
}

fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", routes![index])
        .mount(
            "/",
            routes![
                users::signup_page,
                users::signup,
                users::signin_page,
                users::signin,
                users::logout,
            ],
        )
        .mount(
            "/",
            routes![
                profile::profile,
                profile::edit,
                profile::put_user,
                profile::post_user,
            ],
        )
        .mount(
            "/",
            routes![
                reaction::add_favorite,
                reaction::remove_favorite,
                reaction::add_like,
                reaction::remove_like,
            ],
        )
        .mount(
            "/",
            routes![
                social::top_users,
                social::add_following,
                social::remove_following,
            ],
        )
        .register("/", catchers![unauthorized, not_found, server_error])
}

#[launch]
fn rocket() -> _ {
    let rocket = rocket::build();
    let config = AppConfig::from_env().expect("Failed to read configuration");
    let pool = db::init_pool(&config).expect("Failed to create database pool");
    let uploads = FileServer::from(config.upload_dir.clone());

    mount(rocket)
        .manage(pool)
        .manage(config)
        .mount("/upload", uploads)
        .attach(Template::fairing())
}
