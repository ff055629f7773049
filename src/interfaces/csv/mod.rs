pub mod listing_writer;
pub mod request_reader;
