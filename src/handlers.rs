pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod leads;
pub mod reports;
pub mod users;
