//! Shared test infrastructure for resolver and reload integration tests.
//!
//! Queries are built as wire-format messages with a crafted source address
//! (and optionally an EDNS client subnet option), pushed through
//! `GslbHandler::handle_request()`, and the captured response is parsed
//! back into a `Message` for assertions. No sockets, no privileges.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{MessageRequest, MessageResponse};
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use gslb_dns::health::HealthRegistry;
use gslb_dns::platform::PlatformPool;
use gslb_dns::{loader, GslbHandler, ServerContext};

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a hickory_proto::rr::Record> + Send + 'a,
            impl Iterator<Item = &'a hickory_proto::rr::Record> + Send + 'a,
            impl Iterator<Item = &'a hickory_proto::rr::Record> + Send + 'a,
            impl Iterator<Item = &'a hickory_proto::rr::Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Context builders ---

/// Probe interval short enough for tests to observe transitions.
pub const TEST_PROBE_INTERVAL: Duration = Duration::from_millis(25);

pub fn build_ctx() -> Arc<ServerContext> {
    build_ctx_with(false)
}

pub fn build_ctx_with(private_debug: bool) -> Arc<ServerContext> {
    let pool = PlatformPool::new(HealthRegistry::with_interval(TEST_PROBE_INTERVAL));
    Arc::new(ServerContext::new(pool, None, private_debug))
}

/// Parse zone JSON and publish it under `origin`.
pub fn publish_zone_json(ctx: &ServerContext, origin: &str, json: &str) {
    let zone = loader::parse_zone(origin, json.as_bytes(), 1).expect("zone json");
    ctx.publish_zone(origin, Arc::new(zone));
}

/// Parse node JSON and install it as platform `name`.
pub fn install_nodes(ctx: &ServerContext, name: &str, json: &str) {
    ctx.platforms()
        .add_platform_from_slice(name, json.as_bytes())
        .expect("node json");
    ctx.platforms().health_reconcile(true);
}

// --- Query/Request construction ---

pub fn default_src() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)), 12345)
}

pub fn loopback_src() -> SocketAddr {
    "127.0.0.1:12345".parse().unwrap()
}

/// Build wire-format bytes for a DNS query, optionally carrying ECS.
pub fn build_query_bytes(
    name: &str,
    record_type: RecordType,
    id: u16,
    ecs: Option<(IpAddr, u8)>,
) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);

    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);

    if let Some((addr, prefix)) = ecs {
        let mut edns = Edns::new();
        edns.set_max_payload(4096);
        edns.set_version(0);
        edns.options_mut()
            .insert(EdnsOption::Subnet(ClientSubnet::new(addr, prefix, 0)));
        *msg.extensions_mut() = Some(edns);
    }

    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` with a crafted source address.
pub fn build_request(
    name: &str,
    record_type: RecordType,
    src: SocketAddr,
    id: u16,
    ecs: Option<(IpAddr, u8)>,
) -> Request {
    let bytes = build_query_bytes(name, record_type, id, ecs);
    let msg = parse_message_request(&bytes);
    Request::new(msg, src, Protocol::Udp)
}

/// Execute a query through the handler and return the parsed response.
pub async fn execute_query(
    ctx: &Arc<ServerContext>,
    name: &str,
    record_type: RecordType,
    src: SocketAddr,
    id: u16,
) -> Message {
    execute_query_ecs(ctx, name, record_type, src, id, None).await
}

/// Execute a query carrying an EDNS client subnet option.
pub async fn execute_query_ecs(
    ctx: &Arc<ServerContext>,
    name: &str,
    record_type: RecordType,
    src: SocketAddr,
    id: u16,
    ecs: Option<(IpAddr, u8)>,
) -> Message {
    let handler = GslbHandler::new(ctx.clone());
    let request = build_request(name, record_type, src, id, ecs);
    let response = TestResponseHandler::new();
    handler.handle_request(&request, response.clone()).await;
    response.into_message()
}

// --- Response helpers ---

/// Extract A addresses from the answer section.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert the authority section carries exactly the zone SOA.
pub fn assert_soa_authority(msg: &Message, origin: &str) {
    let soas: Vec<_> = msg
        .name_servers()
        .iter()
        .filter(|r| r.record_type() == RecordType::SOA)
        .collect();
    assert_eq!(soas.len(), 1, "expected one SOA in authority");
    assert_eq!(soas[0].name().to_ascii().to_lowercase(), format!("{origin}."));
}
