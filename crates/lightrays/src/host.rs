use tracing::trace;

/// Host signal the session subscribes to while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    PointerMove,
    Resize,
    Visibility,
}

impl Listener {
    pub const ALL: [Listener; 3] = [Listener::Resize, Listener::PointerMove, Listener::Visibility];
}

/// Handle returned by [`HostEvents::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Host-side registry of the signals forwarded to a session.
pub trait HostEvents {
    fn listen(&mut self, listener: Listener) -> ListenerHandle;

    fn unlisten(&mut self, handle: ListenerHandle);
}

/// Every listener one activation registered, detached together.
#[derive(Debug)]
pub struct Subscriptions {
    handles: Vec<(Listener, ListenerHandle)>,
}

impl Subscriptions {
    /// Registers resize, pointer-move, and visibility listeners.
    pub fn start<H: HostEvents + ?Sized>(host: &mut H) -> Self {
        let handles = Listener::ALL
            .into_iter()
            .map(|listener| (listener, host.listen(listener)))
            .collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Detaches everything registered by [`Subscriptions::start`].
    pub fn stop<H: HostEvents + ?Sized>(self, host: &mut H) {
        for (listener, handle) in self.handles {
            trace!(?listener, handle = handle.0, "detaching host listener");
            host.unlisten(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[test]
    fn stop_detaches_every_listener() {
        let mut host = FakeHost::new();
        let subscriptions = Subscriptions::start(&mut host);
        assert_eq!(subscriptions.len(), 3);
        for listener in Listener::ALL {
            assert!(host.is_listening(listener));
        }

        subscriptions.stop(&mut host);
        assert_eq!(host.active_listeners(), 0);
        assert_eq!(host.detached, 3);
    }
}
