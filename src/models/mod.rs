pub mod admission;
pub mod auth;
pub mod lesson;
pub mod school;
pub mod term;
pub mod transfer;
pub mod user;
