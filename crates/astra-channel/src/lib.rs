//! Channel abstraction for communication between MPC parties.
//!
//! The engine consumes connected, typed [`Sender`]/[`Receiver`] halves; how
//! they are backed is the embedding application's concern. [`in_memory`]
//! provides loopback pairs for tests and single-process runs, and [`multi`]
//! bundles the point-to-point channels of a multi-party setup. A [`Sender`]
//! is itself transmissible over an existing remoc connection, which is how
//! an embedding application wires up remote parties.
use remoc::rch::mpsc;
use remoc::{codec, RemoteSend};

pub mod in_memory;
pub mod multi;
pub mod util;

/// Sender half of an established channel.
pub type Sender<T> = mpsc::Sender<T, codec::Bincode>;
/// Receiver half of an established channel.
pub type Receiver<T> = mpsc::Receiver<T, codec::Bincode>;

/// Create a local channel pair. The [`Sender`] can be transmitted to a
/// remote party over an existing connection, after which sends are delivered
/// remotely.
pub fn channel<T: RemoteSend>(local_buffer: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(local_buffer)
}

/// Errors which can occur when communicating over channels.
#[derive(thiserror::Error, Debug)]
pub enum CommunicationError {
    #[error("error sending value on channel")]
    Send(#[from] mpsc::SendError<()>),
    #[error("error receiving value on channel")]
    Recv(#[from] mpsc::RecvError),
    #[error("channel was terminated by remote")]
    UnexpectedTermination,
    #[error("error on multi-party channel")]
    Multi(#[from] multi::Error),
}
