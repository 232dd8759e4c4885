/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Annotators are identified by their database id (the JWT subject).
pub type UserId = DbId;

/// A video is identified by its asset file name.
pub type VideoId = String;
