// Server module entry
// Listener setup, connection serving, accept loops, shutdown and the cache sweeper

pub mod connection;
pub mod listener;
pub mod signal;
pub mod sweeper;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use connection::Role;
pub use listener::create_reusable_listener;
pub use server_loop::{start_server_loop, ServerLoopConfig};
pub use signal::{start_signal_handler, Shutdown};
pub use sweeper::spawn_sweeper;
