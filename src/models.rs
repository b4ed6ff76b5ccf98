pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod filters;
pub mod leads;
