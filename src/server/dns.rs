//! Wildcard DNS responder
//!
//! Answers every query, for every name, with the AP's own address. That is
//! what herds client traffic to the local HTTP responder and triggers the
//! captive-portal popup on connected devices. Queries that don't parse are
//! dropped silently; a rogue AP has nobody to report errors to.

use std::io;
use std::net::Ipv4Addr;
use tokio::net::UdpSocket;

const MAX_PACKET: usize = 512;

pub struct DnsResponder {
    socket: UdpSocket,
    ap_address: Ipv4Addr,
}

impl DnsResponder {
    pub async fn bind(addr: &str, ap_address: Ipv4Addr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!("DNS responder listening on {}", socket.local_addr()?);
        Ok(Self { socket, ap_address })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one query and answer it. One bounded unit of work.
    pub async fn serve_once(&self) -> io::Result<()> {
        let mut buf = [0u8; MAX_PACKET];
        let (len, peer) = self.socket.recv_from(&mut buf).await?;
        let query = &buf[..len];

        if let Some(response) = build_response(query, self.ap_address) {
            if let Some(name) = query_name(query) {
                tracing::debug!("DNS {} -> {} ({})", name, self.ap_address, peer);
            }
            self.socket.send_to(&response, peer).await?;
        } else {
            tracing::debug!("Dropping unparseable DNS packet from {}", peer);
        }

        Ok(())
    }
}

/// Build a wildcard A answer for the given query, echoing its ID and
/// question section. Returns `None` when the packet has no usable question.
pub fn build_response(query: &[u8], ap_address: Ipv4Addr) -> Option<Vec<u8>> {
    // Header is 12 bytes; we need at least one question.
    if query.len() < 12 {
        return None;
    }
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if qdcount == 0 {
        return None;
    }

    let question_end = question_end(query)?;

    let mut resp = Vec::with_capacity(question_end + 16);

    // ID echoed; QR + RA set, RD copied from the query.
    resp.extend_from_slice(&query[0..2]);
    resp.push(0x80 | (query[2] & 0x01));
    resp.push(0x80);
    resp.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    resp.extend_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    resp.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    resp.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT

    // Question echoed back verbatim.
    resp.extend_from_slice(&query[12..question_end]);

    // Answer: pointer to the question name, IN A, TTL 60.
    resp.extend_from_slice(&[0xC0, 0x0C]);
    resp.extend_from_slice(&1u16.to_be_bytes()); // TYPE A
    resp.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
    resp.extend_from_slice(&60u32.to_be_bytes()); // TTL
    resp.extend_from_slice(&4u16.to_be_bytes()); // RDLENGTH
    resp.extend_from_slice(&ap_address.octets());

    Some(resp)
}

/// Byte offset just past the first question (QNAME + QTYPE + QCLASS).
fn question_end(query: &[u8]) -> Option<usize> {
    let mut pos = 12;

    loop {
        let len = *query.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        // Compression pointers never appear in a sane question.
        if len >= 0xC0 {
            return None;
        }
        pos += 1 + len;
    }

    let end = pos + 4;
    if end <= query.len() {
        Some(end)
    } else {
        None
    }
}

/// The queried name, for logging.
pub fn query_name(query: &[u8]) -> Option<String> {
    let mut pos = 12;
    let mut labels = Vec::new();

    loop {
        let len = *query.get(pos)? as usize;
        if len == 0 {
            break;
        }
        if len >= 0xC0 {
            return None;
        }
        let label = query.get(pos + 1..pos + 1 + len)?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += 1 + len;
    }

    Some(labels.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal query packet for an A lookup of `name`.
    fn encode_query(id: u16, name: &str) -> Vec<u8> {
        let mut q = Vec::new();
        q.extend_from_slice(&id.to_be_bytes());
        q.extend_from_slice(&[0x01, 0x00]); // RD
        q.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
        q.extend_from_slice(&[0; 6]); // AN/NS/AR
        for label in name.split('.') {
            q.push(label.len() as u8);
            q.extend_from_slice(label.as_bytes());
        }
        q.push(0);
        q.extend_from_slice(&1u16.to_be_bytes()); // QTYPE A
        q.extend_from_slice(&1u16.to_be_bytes()); // QCLASS IN
        q
    }

    #[test]
    fn test_wildcard_answer_for_any_name() {
        let ap = Ipv4Addr::new(192, 168, 4, 1);

        for name in ["example.com", "sub.random.test", "a"] {
            let query = encode_query(0xBEEF, name);
            let resp = build_response(&query, ap).unwrap();

            // ID echo.
            assert_eq!(&resp[0..2], &[0xBE, 0xEF]);
            // QR set, one question, one answer.
            assert_eq!(resp[2] & 0x80, 0x80);
            assert_eq!(u16::from_be_bytes([resp[4], resp[5]]), 1);
            assert_eq!(u16::from_be_bytes([resp[6], resp[7]]), 1);
            // Question echoed.
            assert_eq!(&resp[12..query.len()], &query[12..]);
            // RData is always the AP address.
            assert_eq!(&resp[resp.len() - 4..], &ap.octets());
        }
    }

    #[test]
    fn test_name_parse() {
        let query = encode_query(1, "portal.example.com");
        assert_eq!(query_name(&query).unwrap(), "portal.example.com");
    }

    #[test]
    fn test_malformed_packets_dropped() {
        let ap = Ipv4Addr::new(192, 168, 4, 1);

        // Too short.
        assert!(build_response(&[0u8; 5], ap).is_none());
        // No question.
        let mut q = encode_query(1, "x");
        q[5] = 0;
        assert!(build_response(&q, ap).is_none());
        // Truncated question.
        let q = encode_query(1, "example.com");
        assert!(build_response(&q[..q.len() - 6], ap).is_none());
        // Compression pointer in the question.
        let mut q = encode_query(1, "example.com");
        q[12] = 0xC0;
        assert!(build_response(&q, ap).is_none());
    }

    #[tokio::test]
    async fn test_responder_over_udp() {
        let ap = Ipv4Addr::new(10, 0, 0, 1);
        let responder = DnsResponder::bind("127.0.0.1:0", ap).await.unwrap();
        let server_addr = responder.socket.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&encode_query(7, "captive.apple.com"), server_addr)
            .await
            .unwrap();

        let serve = responder.serve_once();
        let recv = async {
            let mut buf = [0u8; MAX_PACKET];
            let (len, _) = client.recv_from(&mut buf).await.unwrap();
            buf[..len].to_vec()
        };
        let (served, resp) = tokio::join!(serve, recv);
        served.unwrap();

        assert_eq!(&resp[resp.len() - 4..], &ap.octets());
    }
}
