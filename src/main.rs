#![allow(dead_code)]
//! Task Manager Frontend Entry Point

mod api;
mod app;
mod config;
mod context;
mod credentials;
mod dashboard;
mod error;
mod logging;
mod models;
mod navigation;
mod routes;
mod session;
mod store;
mod validation;

#[cfg(test)]
mod tests;

use app::App;
use config::AppConfig;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    logging::init(&AppConfig::load().log_level);
    mount_to_body(App);
}
