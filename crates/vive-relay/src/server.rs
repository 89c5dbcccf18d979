use std::net::{SocketAddr, UdpSocket};

use crate::{DeviceRegistry, RelayError, TrackerMessage};

/// Largest request accepted; device names are short.
const MAX_REQUEST: usize = 1024;

pub struct RelayServer<R> {
    registry: R,
}

impl<R: DeviceRegistry> RelayServer<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Reply for one request datagram, `None` when nothing should be sent.
    pub fn handle_request(&self, datagram: &[u8]) -> Option<Vec<u8>> {
        let name = match std::str::from_utf8(datagram.trim_ascii()) {
            Ok(name) => name,
            Err(err) => {
                log::warn!("dropping request that is not UTF-8: {err}");
                return None;
            }
        };
        if name.is_empty() {
            return None;
        }
        let Some(sample) = self.registry.device(name) else {
            log::debug!("unknown device `{name}`");
            return None;
        };
        match TrackerMessage::from_sample(name, &sample).encode() {
            Ok(text) => Some(text.into_bytes()),
            Err(err) => {
                log::error!("failed to encode `{name}`: {err}");
                None
            }
        }
    }

    /// Receive one datagram and answer it. Returns the peer that got a reply.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn serve_once(&self, socket: &UdpSocket) -> Result<Option<SocketAddr>, RelayError> {
        let mut buf = [0u8; MAX_REQUEST];
        let (len, peer) = socket.recv_from(&mut buf)?;
        let Some(reply) = self.handle_request(&buf[..len]) else {
            return Ok(None);
        };
        socket.send_to(&reply, peer)?;
        log::debug!("replied {} bytes to {peer}", reply.len());
        Ok(Some(peer))
    }

    /// Answer requests until the socket fails to receive.
    pub fn serve(&self, socket: &UdpSocket) -> Result<(), RelayError> {
        if let Ok(addr) = socket.local_addr() {
            log::info!("relay listening on {addr}");
        }
        loop {
            match self.serve_once(socket) {
                Ok(_) => {}
                Err(RelayError::Io(err)) if is_transient(&err) => {
                    log::warn!("request skipped: {err}");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_transient(err: &std::io::Error) -> bool {
    use std::io::ErrorKind::*;
    matches!(err.kind(), ConnectionReset | ConnectionRefused | Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceSample, StaticRegistry};

    fn server() -> RelayServer<StaticRegistry> {
        let mut reg = StaticRegistry::new();
        reg.insert(
            "tracker_1",
            DeviceSample {
                x: 0.5,
                ..DeviceSample::default()
            },
        );
        RelayServer::new(reg)
    }

    #[test]
    fn trims_the_requested_name() {
        let reply = server().handle_request(b"  tracker_1\r\n").expect("reply");
        let text = String::from_utf8(reply).expect("utf8");
        assert!(text.ends_with("};"));
        let msg: TrackerMessage =
            serde_json::from_str(text.trim_end_matches(';')).expect("json");
        assert!(msg.valid);
        assert_eq!(msg.device_name, "tracker_1");
        assert_eq!(msg.x, 0.5);
    }

    #[test]
    fn unknown_empty_and_garbage_requests_get_no_reply() {
        let s = server();
        assert!(s.handle_request(b"tracker_9").is_none());
        assert!(s.handle_request(b"   \n").is_none());
        assert!(s.handle_request(&[0xff, 0xfe]).is_none());
    }
}
