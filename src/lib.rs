pub mod auth;
pub mod clients;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod lucky;
pub mod models;
pub mod pages;
pub mod seed;
pub mod slug;
pub mod state;
pub mod templates;
