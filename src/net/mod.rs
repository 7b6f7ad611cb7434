//! Encrypted stream transport

pub mod receiver;
pub mod sender;
pub mod tls;

pub use receiver::StreamReceiver;
pub use sender::StreamSender;
pub use tls::{TlsClient, TlsStream};

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Wait up to `timeout` for a session worker to finish, then give up.
///
/// Best-effort by design: the worker's blocking I/O may outlive the bound
/// even after the socket has been shut down, in which case the handle is
/// dropped and the thread is left to exit on its own.
pub(crate) fn bounded_join(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    tracing::warn!("Session worker did not exit within {:?}, detaching", timeout);
}
