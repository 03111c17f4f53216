pub mod connection;
pub mod issues;
pub mod link;
pub mod shared;
pub mod sync;
