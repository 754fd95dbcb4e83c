pub mod ads_map_service;
pub mod assembler;
pub mod clustering;
pub mod dbscan;
pub mod query_params;
pub mod who_service;
