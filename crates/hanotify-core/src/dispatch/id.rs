use crate::model::NotificationId;

/// Derive the notification id from a collapse key.
///
/// 31-multiplier rolling hash over UTF-16 code units with 32-bit
/// wrap-around, so ids agree with other clients hashing the same key.
pub fn notification_id(collapse_key: &str) -> NotificationId {
    let hash = collapse_key
        .encode_utf16()
        .fold(0_i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    NotificationId(hash)
}
