pub mod browser;
pub mod domain;
pub mod sqlite_db;
pub mod time;
