pub mod http;

use async_trait::async_trait;

use crate::models::{format_price, Booking, RoomListing};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, email: &Email) -> anyhow::Result<()>;
}

/// Used when no email API key is configured: the message only goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, email: &Email) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %email.subject, "email delivery disabled, logging only");
        Ok(())
    }
}

pub fn booking_confirmation(booking: &Booking, room: &RoomListing) -> Email {
    let nights = booking.dates().nights();
    let subject = format!("Your stay at {} is reserved", room.hotel_name);
    let body = format!(
        "Thanks for booking with us!\n\n\
         Hotel: {hotel} ({city})\n\
         Room: {room_name}\n\
         Check-in: {check_in}\n\
         Check-out: {check_out}\n\
         Nights: {nights}\n\
         Guests: {guests}\n\
         Total: {total}\n\n\
         Booking reference: {id}\n\
         Your reservation is held until payment is completed.",
        hotel = room.hotel_name,
        city = room.city,
        room_name = room.room.name,
        check_in = booking.check_in.format("%a %d %b %Y"),
        check_out = booking.check_out.format("%a %d %b %Y"),
        guests = booking.guests,
        total = format_price(booking.total_price_cents),
        id = booking.id,
    );
    Email { subject, body }
}
