pub mod auth;
pub mod authoring;
pub mod invitation;
pub mod notification;
pub mod report;
