pub mod connection_scope;
pub mod orchestrator;
pub mod serializer;
pub mod table_exporter;
