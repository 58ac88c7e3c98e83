//! Per-query resolution pipeline.
//!
//! `GslbHandler` is the hickory request handler for every listener. It
//! dispatches on the longest matching zone origin, walks the label tree,
//! runs weighted selection (static records or platform pool) and assembles
//! the reply. Names that match no configured zone are refused, which also
//! covers the fixed root-zone behavior.

use async_trait::async_trait;
use hickory_proto::op::{Edns, Header, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsCode, EdnsOption};
use hickory_proto::rr::{Name, Record, RecordType};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, trace, warn};

use crate::metrics::{self, Timer};
use crate::qlog::QueryLogEntry;
use crate::state::{ServerContext, RESERVED_ZONE};
use crate::zone::{Lookup, RecordKind, Zone};

/// EDNS buffer size advertised in replies.
const EDNS_MAX_PAYLOAD: u16 = 4096;

/// DNS request handler over the shared server context.
#[derive(Clone)]
pub struct GslbHandler {
    ctx: Arc<ServerContext>,
}

impl GslbHandler {
    /// Handler over a context.
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    async fn refuse<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: &mut R,
    ) -> ResponseInfo {
        metrics::record_refused();

        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_response_code(ResponseCode::Refused);
        header.set_authoritative(false);

        match response_handle.send_response(builder.build_no_records(header)).await {
            Ok(info) => info,
            Err(err) => {
                warn!(%err, "failed to send REFUSED");
                servfail_info()
            }
        }
    }

    async fn serve<R: ResponseHandler>(
        &self,
        zone: &Zone,
        request: &Request,
        response_handle: &mut R,
    ) -> ResponseInfo {
        let timer = Timer::start();

        let Ok(info) = request.request_info() else {
            return self.refuse(request, response_handle).await;
        };
        let qname = info.query.name().to_string();
        let qtype = info.query.query_type();

        debug!(zone = %zone.origin, %qname, %qtype, id = request.id(),
            src = %request.src(), "incoming query");

        // Originating IP: the EDNS client subnet when it carries a real
        // address, the socket peer otherwise.
        let ecs = client_subnet(request).filter(|subnet| !subnet.addr().is_unspecified());
        let client_ip = ecs
            .as_ref()
            .map(ClientSubnet::addr)
            .unwrap_or_else(|| request.src().ip());

        // Targeting by client location is a stub: every query resolves
        // through the catch-all area. The label walk already takes a list
        // so a future targeter can slot in [region, country, "@"].
        let targets = ["@"];

        let key = relative_label(&qname, zone.label_count);

        let mut priority = vec![
            Lookup::Kind(RecordKind::Alias),
            Lookup::Kind(RecordKind::Cname),
        ];
        let qlookup = if qtype == RecordType::ANY {
            Some(Lookup::Any)
        } else {
            RecordKind::from_record_type(qtype).map(Lookup::Kind)
        };
        if let Some(qlookup) = qlookup {
            priority.push(qlookup);
        }

        let (label, matched) = zone.find_labels(&key, &targets, &priority);

        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_recursion_available(false);

        let resp_edns = request.edns().map(|_| {
            let mut edns = Edns::new();
            edns.set_max_payload(EDNS_MAX_PAYLOAD);
            edns.set_version(0);
            if let Some(subnet) = &ecs {
                edns.options_mut().insert(EdnsOption::Subnet(subnet.clone()));
            }
            edns
        });

        let mut answers: Vec<Record> = Vec::new();
        let rcode;

        match label {
            None => {
                trace!(zone = %zone.origin, %key, "no label: NXDOMAIN");
                rcode = ResponseCode::NXDomain;
            }
            Some(label) => {
                rcode = ResponseCode::NoError;
                if let Some(lookup) = matched.or(qlookup) {
                    let mut rng = rand::thread_rng();
                    answers = label.picker(
                        lookup,
                        label.max_hosts,
                        targets[0],
                        self.ctx.platforms(),
                        &mut rng,
                    );
                }

                // Answers carry their stored owner; hand them back under the
                // name the client asked for, case preserved.
                let owner: Name = info.query.original().name().clone();
                for record in &mut answers {
                    record.set_name(owner.clone());
                }
            }
        }
        header.set_response_code(rcode);

        // Negative and empty responses carry the zone SOA so resolvers can
        // cache the absence.
        let soa: Vec<Record> = if answers.is_empty() {
            zone.soa_record().into_iter().collect()
        } else {
            Vec::new()
        };

        let builder = MessageResponseBuilder::from_message_request(request);
        let mut response = builder.build(
            header,
            answers.iter(),
            std::iter::empty(),
            soa.iter(),
            std::iter::empty(),
        );
        if let Some(edns) = resp_edns {
            response.set_edns(edns);
        }

        let sent = match response_handle.send_response(response).await {
            Ok(sent) => sent,
            Err(err) => {
                // If packing failed the write fails; answer SERVFAIL.
                warn!(%err, zone = %zone.origin, %qname, "error writing reply");
                let builder = MessageResponseBuilder::from_message_request(request);
                let failed = builder.error_msg(request.header(), ResponseCode::ServFail);
                match response_handle.send_response(failed).await {
                    Ok(sent) => sent,
                    Err(_) => servfail_info(),
                }
            }
        };

        let qtype_str = qtype.to_string();
        let rcode_str = format!("{rcode:?}");
        metrics::record_query(&zone.origin, &qtype_str, &rcode_str, timer.elapsed());

        if let Some(qlog) = self.ctx.query_log() {
            let client_addr = match &ecs {
                Some(subnet) => format!("{}/{}", subnet.addr(), subnet.source_prefix()),
                None => format!("{}/{}", client_ip, address_bits(&client_ip)),
            };
            qlog.write(&QueryLogEntry {
                time: unix_nanos(),
                origin: zone.origin.clone(),
                name: qname.clone(),
                qtype: qtype_str,
                remote_addr: request.src().ip().to_string(),
                client_addr,
                label: key.split('.').next().unwrap_or_default().to_string(),
                rcode: rcode_str,
                answers: answers.len(),
                has_ecs: ecs.is_some(),
            });
        }

        sent
    }
}

#[async_trait]
impl RequestHandler for GslbHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        if request.message_type() != MessageType::Query
            || request.op_code() != OpCode::Query
        {
            return self.refuse(request, &mut response_handle).await;
        }

        let Ok(info) = request.request_info() else {
            return self.refuse(request, &mut response_handle).await;
        };
        let qname = info.query.name().to_string();

        let Some(zone) = self.ctx.find_zone(&qname) else {
            trace!(%qname, "no zone matches; refusing");
            return self.refuse(request, &mut response_handle).await;
        };

        // The reserved zone can be restricted to loopback clients.
        if zone.origin == RESERVED_ZONE
            && self.ctx.private_debug()
            && !request.src().ip().is_loopback()
        {
            return self.refuse(request, &mut response_handle).await;
        }

        self.serve(&zone, request, &mut response_handle).await
    }
}

/// Zone-relative label key: the query labels minus the zone's own.
fn relative_label(qname: &str, label_count: usize) -> String {
    let name = qname.trim_end_matches('.');
    if name.is_empty() {
        return String::new();
    }
    let labels: Vec<&str> = name.split('.').collect();
    let keep = labels.len().saturating_sub(label_count);
    labels[..keep].join(".").to_lowercase()
}

fn client_subnet(request: &Request) -> Option<ClientSubnet> {
    let edns = request.edns()?;
    match edns.option(EdnsCode::Subnet)? {
        EdnsOption::Subnet(subnet) => Some(subnet.clone()),
        _ => None,
    }
}

fn address_bits(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn unix_nanos() -> i64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or(0)
}

fn servfail_info() -> ResponseInfo {
    let mut header = Header::new();
    header.set_response_code(ResponseCode::ServFail);
    header.into()
}
