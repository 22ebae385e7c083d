pub mod booking;
pub mod chat;
pub mod hotel;
pub mod intent;
pub mod user;

pub use booking::{format_price, Booking, BookingStatus, NewBooking, PaymentStatus, StayDates};
pub use chat::{ActionData, ChatMessage, ChatReply};
pub use hotel::{Hotel, Room, RoomListing, RoomSearch};
pub use intent::{AgentReply, Intent};
pub use user::User;
