pub mod admin;
pub mod auth;
pub mod booking;
pub mod classes;
pub mod health;
pub mod locations;
pub mod services;
