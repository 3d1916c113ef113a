pub mod auth;
pub mod documents;
pub mod formatting;
pub mod payments;
pub mod schedules;
pub mod selectors;
