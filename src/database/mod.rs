pub mod caller_repo;
pub mod candidates;
pub mod cluster_repo;
