pub mod cleanup;
pub mod export;
pub mod onboard;
pub mod serve;
pub mod status;
