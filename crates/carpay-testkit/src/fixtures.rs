use carpay_ledger::{Car, LineKind, LineStatus, PaymentLine, UserProfile};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed reference instant so scenario output is reproducible.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn line(order_code: i64, kind: LineKind, status: LineStatus) -> PaymentLine {
    line_at(order_code, kind, status, 0)
}

/// Line created `offset_secs` after [`t0`].
pub fn line_at(order_code: i64, kind: LineKind, status: LineStatus, offset_secs: i64) -> PaymentLine {
    let amount = match kind {
        LineKind::BookingFee => 200_000,
        LineKind::RentalFee => 1_500_000,
        LineKind::Extension => 500_000,
        LineKind::AdditionalFee => 150_000,
    };
    PaymentLine::new(
        order_code,
        kind,
        amount,
        status,
        t0() + Duration::seconds(offset_secs),
    )
}

pub fn car(car_id: &str) -> Car {
    Car {
        car_id: car_id.to_string(),
        name: format!("Car {car_id}"),
        plate: format!("51A-{car_id}"),
        daily_rate: 800_000,
    }
}

pub fn user(user_id: &str) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        full_name: format!("User {user_id}"),
        phone: None,
    }
}
