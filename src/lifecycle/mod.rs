//! Process lifecycle: shutdown on SIGINT and SIGTERM

mod shutdown;

pub use shutdown::ShutdownSignal;
