pub mod calendar_checker;
pub mod checker;
pub mod keyword_checker;
pub mod message_service;
