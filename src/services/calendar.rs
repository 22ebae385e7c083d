use crate::models::{Booking, RoomListing};

/// An all-day event covering the stay. DTEND is exclusive, so it is the
/// check-out date itself.
pub fn generate_ics(booking: &Booking, room: &RoomListing) -> String {
    let dtstart = booking.check_in.format("%Y%m%d").to_string();
    let dtend = booking.check_out.format("%Y%m%d").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@innkeeper", booking.id);

    let summary = escape_text(&format!("Stay at {}", room.hotel_name));
    let location = escape_text(&room.city);
    let description = escape_text(&format!(
        "{} ({}), {} guest{}",
        room.room.name,
        room.room.room_type,
        booking.guests,
        if booking.guests == 1 { "" } else { "s" },
    ));

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Innkeeper//Hotel Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART;VALUE=DATE:{dtstart}\r\n\
         DTEND;VALUE=DATE:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         LOCATION:{location}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

/// Escapes a TEXT property value (RFC 5545 §3.3.11).
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, PaymentStatus, Room};
    use chrono::NaiveDateTime;

    fn listing() -> RoomListing {
        RoomListing {
            room: Room {
                id: "r1".to_string(),
                hotel_id: "h1".to_string(),
                name: "Sea View Double".to_string(),
                room_type: "double".to_string(),
                capacity: 2,
                price_per_night_cents: 12000,
                description: None,
            },
            hotel_name: "Harbor Inn".to_string(),
            city: "Lisbon".to_string(),
        }
    }

    fn booking(guests: i32) -> Booking {
        let created = NaiveDateTime::parse_from_str("2030-03-10 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "test-123".to_string(),
            user_id: "u1".to_string(),
            room_id: "r1".to_string(),
            check_in: "2030-03-15".parse().unwrap(),
            check_out: "2030-03-18".parse().unwrap(),
            guests,
            total_price_cents: 36000,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            checkout_session_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(2), &listing());
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20300315"));
        assert!(ics.contains("DTEND;VALUE=DATE:20300318"));
        assert!(ics.contains("DTSTAMP:20300310T100000Z"));
        assert!(ics.contains("SUMMARY:Stay at Harbor Inn"));
        assert!(ics.contains("LOCATION:Lisbon"));
        assert!(ics.contains("DESCRIPTION:Sea View Double (double)\\, 2 guests"));
        assert!(ics.contains("UID:test-123@innkeeper"));
        assert!(ics.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_generate_ics_single_guest() {
        let ics = generate_ics(&booking(1), &listing());
        assert!(ics.contains("DESCRIPTION:Sea View Double (double)\\, 1 guest\r\n"));
    }

    #[test]
    fn test_text_values_are_escaped() {
        let mut room = listing();
        room.hotel_name = "Inn; Spa, and\nEND:VCALENDAR".to_string();
        room.city = "Lisbon\\Belém".to_string();
        let ics = generate_ics(&booking(2), &room);
        assert!(ics.contains("SUMMARY:Stay at Inn\\; Spa\\, and\\nEND:VCALENDAR\r\n"));
        assert!(ics.contains("LOCATION:Lisbon\\\\Belém\r\n"));
        assert_eq!(ics.lines().filter(|l| *l == "END:VCALENDAR").count(), 1);
    }
}
