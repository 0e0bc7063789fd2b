pub mod poller;
pub mod source;
