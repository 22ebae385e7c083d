use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, Hotel, PaymentStatus, Room, RoomListing, RoomSearch, StayDates, User,
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn now_string() -> String {
    Utc::now().naive_utc().format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored date {s:?}: {e}"))
}

// ── Users ──

pub fn upsert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
        params![
            user.id,
            user.email,
            user.name,
            user.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, name, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn delete_user(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Hotels ──

pub fn create_hotel(conn: &Connection, hotel: &Hotel) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO hotels (id, name, city, address, description, rating, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            hotel.id,
            hotel.name,
            hotel.city,
            hotel.address,
            hotel.description,
            hotel.rating,
            hotel.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

fn parse_hotel_row(row: &rusqlite::Row) -> rusqlite::Result<Hotel> {
    let created_at: String = row.get(6)?;
    Ok(Hotel {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        address: row.get(3)?,
        description: row.get(4)?,
        rating: row.get(5)?,
        created_at: parse_datetime(&created_at),
    })
}

pub fn get_hotel(conn: &Connection, id: &str) -> anyhow::Result<Option<Hotel>> {
    let hotel = conn
        .query_row(
            "SELECT id, name, city, address, description, rating, created_at FROM hotels WHERE id = ?1",
            params![id],
            parse_hotel_row,
        )
        .optional()?;
    Ok(hotel)
}

pub fn list_hotels(conn: &Connection, city: Option<&str>) -> anyhow::Result<Vec<Hotel>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, city, address, description, rating, created_at FROM hotels
         WHERE ?1 IS NULL OR lower(city) = lower(?1)
         ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![city], parse_hotel_row)?;

    let mut hotels = vec![];
    for row in rows {
        hotels.push(row?);
    }
    Ok(hotels)
}

// ── Rooms ──

pub fn create_room(conn: &Connection, room: &Room) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO rooms (id, hotel_id, name, room_type, capacity, price_per_night_cents, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            room.id,
            room.hotel_id,
            room.name,
            room.room_type,
            room.capacity,
            room.price_per_night_cents,
            room.description,
        ],
    )?;
    Ok(())
}

const ROOM_LISTING_COLUMNS: &str = "r.id, r.hotel_id, r.name, r.room_type, r.capacity, \
     r.price_per_night_cents, r.description, h.name, h.city";

fn parse_room_listing_row(row: &rusqlite::Row) -> rusqlite::Result<RoomListing> {
    Ok(RoomListing {
        room: Room {
            id: row.get(0)?,
            hotel_id: row.get(1)?,
            name: row.get(2)?,
            room_type: row.get(3)?,
            capacity: row.get(4)?,
            price_per_night_cents: row.get(5)?,
            description: row.get(6)?,
        },
        hotel_name: row.get(7)?,
        city: row.get(8)?,
    })
}

pub fn get_room(conn: &Connection, id: &str) -> anyhow::Result<Option<RoomListing>> {
    let sql = format!(
        "SELECT {ROOM_LISTING_COLUMNS} FROM rooms r JOIN hotels h ON h.id = r.hotel_id WHERE r.id = ?1"
    );
    let room = conn
        .query_row(&sql, params![id], parse_room_listing_row)
        .optional()?;
    Ok(room)
}

pub fn list_rooms_for_hotel(conn: &Connection, hotel_id: &str) -> anyhow::Result<Vec<RoomListing>> {
    let sql = format!(
        "SELECT {ROOM_LISTING_COLUMNS} FROM rooms r JOIN hotels h ON h.id = r.hotel_id
         WHERE r.hotel_id = ?1 ORDER BY r.price_per_night_cents ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![hotel_id], parse_room_listing_row)?;

    let mut rooms = vec![];
    for row in rows {
        rooms.push(row?);
    }
    Ok(rooms)
}

pub fn search_rooms(conn: &Connection, search: &RoomSearch) -> anyhow::Result<Vec<RoomListing>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(city) = search.city.as_deref().filter(|c| !c.trim().is_empty()) {
        params_vec.push(Box::new(city.trim().to_string()));
        clauses.push(format!("lower(h.city) = lower(?{})", params_vec.len()));
    }
    if let Some(guests) = search.guests {
        params_vec.push(Box::new(guests));
        clauses.push(format!("r.capacity >= ?{}", params_vec.len()));
    }
    if let Some(max_price) = search.max_price_cents {
        params_vec.push(Box::new(max_price));
        clauses.push(format!("r.price_per_night_cents <= ?{}", params_vec.len()));
    }
    if let Some(room_type) = search.room_type.as_deref().filter(|t| !t.trim().is_empty()) {
        params_vec.push(Box::new(room_type.trim().to_string()));
        clauses.push(format!("lower(r.room_type) = lower(?{})", params_vec.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {ROOM_LISTING_COLUMNS} FROM rooms r JOIN hotels h ON h.id = r.hotel_id
         {where_clause} ORDER BY r.price_per_night_cents ASC, h.name ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_room_listing_row)?;

    let mut rooms = vec![];
    for row in rows {
        rooms.push(row?);
    }
    Ok(rooms)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, user_id, room_id, check_in, check_out, guests, total_price_cents, \
     status, payment_status, checkout_session_id, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, room_id, check_in, check_out, guests, total_price_cents,
                               status, payment_status, checkout_session_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.user_id,
            booking.room_id,
            booking.check_in.format(DATE_FORMAT).to_string(),
            booking.check_out.format(DATE_FORMAT).to_string(),
            booking.guests,
            booking.total_price_cents,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.checkout_session_id,
            booking.created_at.format(DATETIME_FORMAT).to_string(),
            booking.updated_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let check_in: String = row.get(3)?;
    let check_out: String = row.get(4)?;
    let status: String = row.get(7)?;
    let payment_status: String = row.get(8)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        room_id: row.get(2)?,
        check_in: parse_date(&check_in)?,
        check_out: parse_date(&check_out)?,
        guests: row.get(5)?,
        total_price_cents: row.get(6)?,
        status: BookingStatus::parse(&status),
        payment_status: PaymentStatus::parse(&payment_status),
        checkout_session_id: row.get(9)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn collect_bookings(
    stmt: &mut rusqlite::Statement,
    params: &[&dyn ToSql],
) -> anyhow::Result<Vec<Booking>> {
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    result.transpose()
}

pub fn get_booking_by_session(conn: &Connection, session_id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE checkout_session_id = ?1");
    let result = conn
        .query_row(&sql, params![session_id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    result.transpose()
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY check_in ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    collect_bookings(&mut stmt, params![user_id])
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY check_in DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    collect_bookings(&mut stmt, params![status_filter, limit])
}

/// Non-cancelled bookings on `room_id` whose stay intersects `dates`.
/// Ranges are half-open, so a stay ending on `dates.check_in` is not returned.
pub fn get_overlapping_bookings(
    conn: &Connection,
    room_id: &str,
    dates: &StayDates,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE room_id = ?1 AND status != 'cancelled' AND check_in < ?2 AND check_out > ?3
         ORDER BY check_in ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    collect_bookings(
        &mut stmt,
        params![
            room_id,
            dates.check_out.format(DATE_FORMAT).to_string(),
            dates.check_in.format(DATE_FORMAT).to_string(),
        ],
    )
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: &BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_string(), id],
    )?;
    Ok(count > 0)
}

pub fn set_checkout_session(conn: &Connection, id: &str, session_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET checkout_session_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![session_id, now_string(), id],
    )?;
    Ok(count > 0)
}

/// Confirms a pending booking once its payment has gone through. Cancelled
/// bookings are left alone.
pub fn mark_booking_paid(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'confirmed', payment_status = 'paid', updated_at = ?1
         WHERE id = ?2 AND status != 'cancelled'",
        params![now_string(), id],
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now().naive_utc();
        create_hotel(
            &conn,
            &Hotel {
                id: "h1".to_string(),
                name: "Harbor Inn".to_string(),
                city: "Lisbon".to_string(),
                address: None,
                description: None,
                rating: Some(4.5),
                created_at: now,
            },
        )
        .unwrap();
        for (id, room_type, capacity, price) in [
            ("r1", "double", 2, 12000),
            ("r2", "suite", 4, 30000),
            ("r3", "single", 1, 8000),
        ] {
            create_room(
                &conn,
                &Room {
                    id: id.to_string(),
                    hotel_id: "h1".to_string(),
                    name: format!("Room {id}"),
                    room_type: room_type.to_string(),
                    capacity,
                    price_per_night_cents: price,
                    description: None,
                },
            )
            .unwrap();
        }
        upsert_user(
            &conn,
            &User {
                id: "u1".to_string(),
                email: "guest@example.com".to_string(),
                name: Some("Guest".to_string()),
                created_at: now,
            },
        )
        .unwrap();
        conn
    }

    fn booking(id: &str, room_id: &str, check_in: &str, check_out: &str) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: id.to_string(),
            user_id: "u1".to_string(),
            room_id: room_id.to_string(),
            check_in: check_in.parse().unwrap(),
            check_out: check_out.parse().unwrap(),
            guests: 2,
            total_price_cents: 24000,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            checkout_session_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn stay(a: &str, b: &str) -> StayDates {
        StayDates {
            check_in: a.parse().unwrap(),
            check_out: b.parse().unwrap(),
        }
    }

    #[test]
    fn test_search_filters() {
        let conn = setup();

        let all = search_rooms(&conn, &RoomSearch::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].room.id, "r3"); // cheapest first

        let lisbon_pairs = search_rooms(
            &conn,
            &RoomSearch {
                city: Some("lisbon".to_string()),
                guests: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        let ids: Vec<_> = lisbon_pairs.iter().map(|r| r.room.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);

        let cheap = search_rooms(
            &conn,
            &RoomSearch {
                max_price_cents: Some(12000),
                room_type: Some("Double".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].hotel_name, "Harbor Inn");

        let elsewhere = search_rooms(
            &conn,
            &RoomSearch {
                city: Some("Porto".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(elsewhere.is_empty());
    }

    #[test]
    fn test_overlapping_bookings() {
        let conn = setup();
        create_booking(&conn, &booking("b1", "r1", "2030-05-01", "2030-05-04")).unwrap();

        let hits = get_overlapping_bookings(&conn, "r1", &stay("2030-05-03", "2030-05-05")).unwrap();
        assert_eq!(hits.len(), 1);

        let back_to_back =
            get_overlapping_bookings(&conn, "r1", &stay("2030-05-04", "2030-05-06")).unwrap();
        assert!(back_to_back.is_empty());

        let other_room =
            get_overlapping_bookings(&conn, "r2", &stay("2030-05-01", "2030-05-04")).unwrap();
        assert!(other_room.is_empty());
    }

    #[test]
    fn test_cancelled_bookings_do_not_block() {
        let conn = setup();
        create_booking(&conn, &booking("b1", "r1", "2030-05-01", "2030-05-04")).unwrap();
        assert!(update_booking_status(&conn, "b1", &BookingStatus::Cancelled).unwrap());

        let hits = get_overlapping_bookings(&conn, "r1", &stay("2030-05-01", "2030-05-04")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_mark_paid_skips_cancelled() {
        let conn = setup();
        create_booking(&conn, &booking("b1", "r1", "2030-05-01", "2030-05-04")).unwrap();
        create_booking(&conn, &booking("b2", "r2", "2030-05-01", "2030-05-04")).unwrap();
        update_booking_status(&conn, "b2", &BookingStatus::Cancelled).unwrap();

        assert!(mark_booking_paid(&conn, "b1").unwrap());
        assert!(!mark_booking_paid(&conn, "b2").unwrap());

        let b1 = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(b1.status, BookingStatus::Confirmed);
        assert_eq!(b1.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_checkout_session_lookup() {
        let conn = setup();
        create_booking(&conn, &booking("b1", "r1", "2030-05-01", "2030-05-04")).unwrap();
        set_checkout_session(&conn, "b1", "cs_test_1").unwrap();

        let found = get_booking_by_session(&conn, "cs_test_1").unwrap().unwrap();
        assert_eq!(found.id, "b1");
        assert!(get_booking_by_session(&conn, "cs_missing").unwrap().is_none());
    }

    #[test]
    fn test_user_upsert_and_delete() {
        let conn = setup();
        let mut user = get_user(&conn, "u1").unwrap().unwrap();
        user.email = "new@example.com".to_string();
        upsert_user(&conn, &user).unwrap();
        assert_eq!(get_user(&conn, "u1").unwrap().unwrap().email, "new@example.com");

        assert!(delete_user(&conn, "u1").unwrap());
        assert!(get_user(&conn, "u1").unwrap().is_none());
    }

    #[test]
    fn test_list_hotels_by_city() {
        let conn = setup();
        assert_eq!(list_hotels(&conn, None).unwrap().len(), 1);
        assert_eq!(list_hotels(&conn, Some("LISBON")).unwrap().len(), 1);
        assert!(list_hotels(&conn, Some("Paris")).unwrap().is_empty());
    }
}
