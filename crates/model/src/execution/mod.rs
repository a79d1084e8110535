pub mod failed_batch;
pub mod failed_record;
