pub mod layout;
pub mod record;
pub mod partition_writer;
