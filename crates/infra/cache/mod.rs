pub mod memory_view_cache;
