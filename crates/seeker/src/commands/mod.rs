pub mod index;
pub mod init;
pub mod search;
pub mod serve;
pub mod stats;
