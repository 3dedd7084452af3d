pub mod date_key;
