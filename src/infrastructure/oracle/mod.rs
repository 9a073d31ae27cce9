pub mod oracle_database_adapter;
