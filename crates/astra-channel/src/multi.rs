//! Multi-party channels: one point-to-point channel per remote party.
use crate::{channel, Receiver, Sender};
use futures::stream::FuturesUnordered;
use futures::Stream;
use futures::StreamExt;
use remoc::rch::mpsc;
use remoc::RemoteSend;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to multi-send message")]
    MultiSend(Vec<mpsc::SendError<()>>),
    #[error("unable to multi-recv message")]
    MultiRecv(Option<mpsc::RecvError>),
    #[error("unknown party id")]
    UnknownParty(u32),
}

#[derive(Debug)]
pub struct MultiSender<T> {
    senders: HashMap<u32, Sender<T>>,
}

#[derive(Debug)]
pub struct MultiReceiver<T> {
    receivers: HashMap<u32, Receiver<T>>,
}

impl<T: RemoteSend> MultiSender<T> {
    pub fn sender(&self, to: u32) -> Option<&Sender<T>> {
        self.senders.get(&to)
    }

    pub fn senders(&self) -> impl Iterator<Item = (&u32, &Sender<T>)> {
        self.senders.iter()
    }

    /// Register the channel to a remote party.
    pub fn insert(&mut self, to: u32, sender: Sender<T>) {
        self.senders.insert(to, sender);
    }
}

impl<T: RemoteSend + Clone> MultiSender<T> {
    pub async fn send_to(&self, to: impl IntoIterator<Item = u32>, msg: T) -> Result<(), Error> {
        let mut fu = FuturesUnordered::new();
        for to in to {
            debug!(to, "Sending");
            let sender = self.senders.get(&to).ok_or(Error::UnknownParty(to))?;
            fu.push(sender.send(msg.clone()));
        }
        let mut errors = vec![];
        loop {
            match fu.next().await {
                None => break,
                Some(Ok(())) => continue,
                Some(Err(err)) => errors.push(err.without_item()),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::MultiSend(errors))
        }
    }

    pub async fn send_all(&self, msg: T) -> Result<(), Error> {
        self.send_to(self.senders.keys().copied(), msg).await
    }
}

#[derive(Debug, Eq, PartialEq, Hash)]
pub struct MsgFrom<T> {
    from: u32,
    msg: T,
}

impl<T: RemoteSend> MultiReceiver<T> {
    pub async fn recv_from_single(&mut self, from: u32) -> Result<T, Error> {
        let receiver = self
            .receivers
            .get_mut(&from)
            .ok_or(Error::UnknownParty(from))?;
        Ok(map_recv_fut((&from, receiver)).await?.into_msg())
    }

    pub fn recv_from(
        &mut self,
        from: &HashSet<u32>,
    ) -> impl Stream<Item = Result<MsgFrom<T>, Error>> + '_ {
        self.receivers
            .iter_mut()
            .filter(|(id, _)| from.contains(*id))
            .map(map_recv_fut)
            .collect::<FuturesUnordered<_>>()
    }

    pub fn recv_all(&mut self) -> impl Stream<Item = Result<MsgFrom<T>, Error>> + '_ {
        self.receivers
            .iter_mut()
            .map(map_recv_fut)
            .collect::<FuturesUnordered<_>>()
    }

    pub fn receiver(&mut self, from: u32) -> Option<&mut Receiver<T>> {
        self.receivers.get_mut(&from)
    }

    pub fn receivers(&mut self) -> impl Iterator<Item = (&u32, &mut Receiver<T>)> {
        self.receivers.iter_mut()
    }

    /// Register the channel from a remote party.
    pub fn insert(&mut self, from: u32, receiver: Receiver<T>) {
        self.receivers.insert(from, receiver);
    }
}

#[inline]
async fn map_recv_fut<T: RemoteSend>(
    (from, receiver): (&u32, &mut Receiver<T>),
) -> Result<MsgFrom<T>, Error> {
    match receiver.recv().await {
        Ok(Some(msg)) => {
            debug!(from, "Received msg");
            Ok(MsgFrom { from: *from, msg })
        }
        Ok(None) => Err(Error::MultiRecv(None)),
        Err(err) => Err(Error::MultiRecv(Some(err))),
    }
}

impl<T> MsgFrom<T> {
    pub fn from_party(&self) -> u32 {
        self.from
    }

    pub fn into_msg(self) -> T {
        self.msg
    }
}

/// Fully connected in-memory channels for `parties` parties.
pub fn new_local<T: RemoteSend>(parties: usize) -> Vec<(MultiSender<T>, MultiReceiver<T>)> {
    let mut res: Vec<(MultiSender<T>, MultiReceiver<T>)> =
        (0..parties).map(|_| Default::default()).collect();
    for party in 0..parties {
        for other in 0..parties {
            if party == other {
                continue;
            }
            let (sender, receiver) = channel(128);
            res[party].0.insert(other as u32, sender);
            res[other].1.insert(party as u32, receiver);
        }
    }
    res
}

impl<T> Default for MultiSender<T> {
    fn default() -> Self {
        Self {
            senders: Default::default(),
        }
    }
}

impl<T> Default for MultiReceiver<T> {
    fn default() -> Self {
        Self {
            receivers: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::init_tracing;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn send_receive_via_local_multi_channel() {
        let _g = init_tracing();
        let mut channels = new_local::<String>(3);
        let (_, (sender1, _), (_, mut receiver2)) = {
            let mut it = channels.drain(..);
            (it.next().unwrap(), it.next().unwrap(), it.next().unwrap())
        };
        sender1
            .send_to([2], "hello there".to_string())
            .await
            .unwrap();
        let msg = receiver2.recv_from_single(1).await.unwrap();
        assert_eq!("hello there", msg);
    }

    #[tokio::test]
    async fn broadcast_and_collect() {
        let _g = init_tracing();
        let mut channels = new_local::<u64>(3);
        let (s0, _) = channels.remove(0);
        s0.send_all(42).await.unwrap();
        for (id, (_, receiver)) in channels.iter_mut().enumerate() {
            let received: Vec<_> = receiver
                .recv_from(&HashSet::from([0]))
                .try_collect()
                .await
                .unwrap();
            assert_eq!(received.len(), 1, "party {}", id + 1);
            let msg = received.into_iter().next().unwrap();
            assert_eq!(msg.from_party(), 0);
            assert_eq!(msg.into_msg(), 42);
        }
    }
}
