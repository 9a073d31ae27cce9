pub mod object_store_adapter;
