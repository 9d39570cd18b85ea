pub mod auth;
pub mod project;
pub mod bid;
pub mod rating;
pub mod contractor;
