//! # printhub-realtime
//!
//! Notification channel for PrintHub. Delivers one newline-terminated JSON
//! job record per connection from the producer to a live consumer:
//!
//! - Local-domain (Unix) socket receiver, world-connectable
//! - Loopback TCP receiver as a portability fallback
//! - Sender trying the Unix socket first, then TCP
//!
//! The channel is a best-effort hint with no retry and no acknowledgment.
//! Durability comes from the spool store.

pub mod message;
pub mod receiver;
pub mod sender;

pub use receiver::bind_all;
pub use receiver::tcp::TcpReceiver;
#[cfg(unix)]
pub use receiver::unix::UnixReceiver;
pub use sender::NotificationSender;
