pub mod client;
pub mod fetcher;
pub mod persister;
pub mod pipeline;
pub mod poller;
pub mod schemas;
