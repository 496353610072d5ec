pub mod auth;
pub mod list_view;
pub mod pages;
pub mod session;
pub mod user_admin;
