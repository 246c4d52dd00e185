use crate::infrastructure::error::TransportError;
use async_trait::async_trait;

/// Duplex message channel to the relay (allows swapping the network in tests)
///
/// Each successful `connect` starts a fresh inbound sequence. `recv` yields
/// messages until the connection ends and then returns `None` until the next
/// `connect`. `recv` must be cancel safe: dropping its future loses nothing.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, endpoint: &str) -> Result<(), TransportError>;

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Option<Vec<u8>>;

    async fn close(&mut self);

    fn is_connected(&self) -> bool;
}

/// Creates one transport per matchmaking attempt
pub trait TransportFactory: Send {
    fn create(&mut self) -> Box<dyn Transport>;
}

impl<F, T> TransportFactory for F
where
    F: FnMut() -> T + Send,
    T: Transport + 'static,
{
    fn create(&mut self) -> Box<dyn Transport> {
        Box::new(self())
    }
}
