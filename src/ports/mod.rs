pub mod database_port;
pub mod storage_port;
