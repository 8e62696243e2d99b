pub mod accounts;
pub mod digest;
pub mod library;
pub mod mailer;
pub mod providers;
pub mod quiz;
pub mod recommendations;
