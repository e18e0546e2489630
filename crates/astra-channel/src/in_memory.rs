//! In-memory channels for testing.
use crate::{channel, Receiver, Sender};
use remoc::RemoteSend;

/// Create a connected pair of channels backed by local memory.
pub fn new_pair<T: RemoteSend>(
    local_buffer: usize,
) -> ((Sender<T>, Receiver<T>), (Sender<T>, Receiver<T>)) {
    let (sender1, receiver1) = channel(local_buffer);
    let (sender2, receiver2) = channel(local_buffer);

    ((sender1, receiver2), (sender2, receiver1))
}

#[cfg(test)]
mod tests {
    use super::new_pair;

    #[tokio::test]
    async fn send_receive() {
        let ((mut tx1, mut rx1), (mut tx2, mut rx2)) = new_pair::<u64>(4);
        tx1.send(42).await.unwrap();
        tx2.send(7).await.unwrap();
        assert_eq!(Some(42), rx2.recv().await.unwrap());
        assert_eq!(Some(7), rx1.recv().await.unwrap());
    }
}
