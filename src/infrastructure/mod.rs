pub mod object_storage;
pub mod oracle;
