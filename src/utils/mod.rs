pub mod db_utils;
pub mod event_cache;
pub mod response;
