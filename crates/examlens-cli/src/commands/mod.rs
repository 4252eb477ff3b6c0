pub mod analyze;
pub mod init;
pub mod reattempt;
pub mod reconcile;
pub mod render;
pub mod results;
pub mod sign_out;
pub mod sync;
