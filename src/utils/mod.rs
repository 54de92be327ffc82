pub mod netrc;
pub mod time;
