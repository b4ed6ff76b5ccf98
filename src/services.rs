pub mod access_policy;
pub mod activity_service;
pub mod auth;
pub mod dashboard_service;
pub mod lead_query;
pub mod lead_service;
pub mod report_service;
