pub mod ai;
pub mod booking;
pub mod calendar;
pub mod chat;
pub mod email;
pub mod identity;
pub mod payments;
