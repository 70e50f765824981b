pub mod auth_service;
pub mod documentation;
pub mod feed_service;
pub mod health_service;
pub mod match_service;
pub mod sse_service;
pub mod storage_supervisor;
pub mod view_service;
