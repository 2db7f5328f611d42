pub const CSRF_TOKEN_COOKIE_NAME: &str = "csrf_token";
pub const NOTIFICATION_COOKIE_NAME: &str = "notification";

/// Max candidates offered when no code matched
pub const PARTIAL_MATCH_LIMIT: usize = 5;
pub const TAG_CODE_PREFIX: &str = "PLK";
pub const TAG_CODE_RANDOM_LEN: usize = 6;

pub const VALID_PET_TYPES: [&str; 5] = ["dog", "cat", "bird", "rabbit", "other"];
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

pub const MAX_AGE_COOKIES: i64 = chrono::TimeDelta::hours(4).num_seconds();
