pub mod activity;
pub mod ai;
pub mod auth;
pub mod checkin;
pub mod child;
pub mod institution;
pub mod notification;
pub mod resource;
pub mod safety;
pub mod user;
