pub mod load_cache;
