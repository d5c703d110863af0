pub mod admin;
pub mod auth;
pub mod health;
pub mod commissions;
pub mod conversions;
pub mod links;
pub mod middleware;
pub mod payouts;

mod time;
