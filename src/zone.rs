//! In-memory zone model: labels, typed record sets and selection.
//!
//! A published `Zone` is immutable and `Arc`-shared; the reloader swaps
//! whole zones in the server context, so a query observes one consistent
//! snapshot for its entire duration.

use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, NULL, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::platform::{AddressFamily, PlatformPool};
use crate::sampler::WeightedSelector;

/// Record types the zone model carries.
///
/// `Alias` is the in-zone follow-me record (stored on the wire-obsolete MF
/// type code) and never leaves the server; `Spf` keeps the dedicated type 99
/// on the wire even though its payload is TXT-shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name.
    Cname,
    /// In-zone alias (MF, type 4).
    Alias,
    /// Mail exchange.
    Mx,
    /// Delegation.
    Ns,
    /// Text record.
    Txt,
    /// Sender policy framework (type 99).
    Spf,
    /// Service locator.
    Srv,
    /// Reverse pointer.
    Ptr,
    /// Start of authority.
    Soa,
}

/// Numeric type code of the internal alias record (MF).
const ALIAS_TYPE: u16 = 4;
/// Numeric type code of SPF.
const SPF_TYPE: u16 = 99;

impl RecordKind {
    /// Map a zone-file key to a kind; unknown keys are skipped by the loader.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "a" => Self::A,
            "aaaa" => Self::Aaaa,
            "cname" => Self::Cname,
            "alias" => Self::Alias,
            "mx" => Self::Mx,
            "ns" => Self::Ns,
            "txt" => Self::Txt,
            "spf" => Self::Spf,
            "srv" => Self::Srv,
            "ptr" => Self::Ptr,
            _ => return None,
        })
    }

    /// Map a wire query type to a kind.
    pub fn from_record_type(rtype: RecordType) -> Option<Self> {
        Some(match rtype {
            RecordType::A => Self::A,
            RecordType::AAAA => Self::Aaaa,
            RecordType::CNAME => Self::Cname,
            RecordType::MX => Self::Mx,
            RecordType::NS => Self::Ns,
            RecordType::TXT => Self::Txt,
            RecordType::SRV => Self::Srv,
            RecordType::PTR => Self::Ptr,
            RecordType::SOA => Self::Soa,
            RecordType::Unknown(ALIAS_TYPE) => Self::Alias,
            RecordType::Unknown(SPF_TYPE) => Self::Spf,
            _ => return None,
        })
    }
}

/// What a lookup is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Every type the label carries.
    Any,
    /// One specific kind.
    Kind(RecordKind),
}

/// Typed payload of one record.
#[derive(Debug, Clone)]
pub enum RecordData {
    /// IPv4 address.
    A(std::net::Ipv4Addr),
    /// IPv6 address.
    Aaaa(std::net::Ipv6Addr),
    /// CNAME target, fully qualified.
    Cname(Name),
    /// Alias target: a zone-relative label key, not a domain name.
    Alias(String),
    /// MX preference and exchange.
    Mx {
        /// Lower is preferred.
        preference: u16,
        /// Exchange host, fully qualified.
        exchange: Name,
    },
    /// NS target, fully qualified.
    Ns(Name),
    /// TXT payload.
    Txt(String),
    /// SPF payload, TXT-shaped.
    Spf(String),
    /// SRV fields.
    Srv {
        /// Priority, lower preferred.
        priority: u16,
        /// SRV weight (wire field, unrelated to selection weight).
        weight: u16,
        /// Service port.
        port: u16,
        /// Target host, fully qualified.
        target: Name,
    },
    /// PTR target, fully qualified.
    Ptr(Name),
    /// Zone SOA payload.
    Soa(SOA),
}

impl RecordData {
    /// Wire payload for this record, if the kind has one.
    ///
    /// Alias records are internal and yield `None`.
    pub fn to_rdata(&self) -> Option<RData> {
        Some(match self {
            Self::A(ip) => RData::A(A::from(*ip)),
            Self::Aaaa(ip) => RData::AAAA(AAAA::from(*ip)),
            Self::Cname(name) => RData::CNAME(CNAME(name.clone())),
            Self::Alias(_) => return None,
            Self::Mx { preference, exchange } => RData::MX(MX::new(*preference, exchange.clone())),
            Self::Ns(name) => RData::NS(NS(name.clone())),
            Self::Txt(text) => RData::TXT(TXT::new(vec![text.clone()])),
            Self::Spf(text) => RData::Unknown {
                code: RecordType::Unknown(SPF_TYPE),
                rdata: NULL::with(encode_character_strings(text)),
            },
            Self::Srv { priority, weight, port, target } => {
                RData::SRV(SRV::new(*priority, *weight, *port, target.clone()))
            }
            Self::Ptr(name) => RData::PTR(PTR(name.clone())),
            Self::Soa(soa) => RData::SOA(soa.clone()),
        })
    }
}

/// One resource record plus its selection weight.
#[derive(Debug, Clone)]
pub struct ZoneRecord {
    /// Owner name as loaded (`label.origin.` or `origin.`).
    pub name: Name,
    /// TTL in seconds.
    pub ttl: u32,
    /// Selection weight; 0 means the whole set is returned unsampled.
    pub weight: u64,
    /// Typed payload.
    pub data: RecordData,
}

impl ZoneRecord {
    /// Build the wire record, if this kind has a wire form.
    pub fn to_wire(&self) -> Option<Record> {
        let mut record = Record::from_rdata(self.name.clone(), self.ttl, self.data.to_rdata()?);
        record.set_dns_class(DNSClass::IN);
        Some(record)
    }
}

/// A name node within a zone.
#[derive(Debug, Clone)]
pub struct Label {
    /// Zone-relative key, lowercase, dot-joined; empty for the root.
    pub name: String,
    /// TTL applied to owned records after load.
    pub ttl: u32,
    /// Cap on synthesized answers.
    pub max_hosts: usize,
    /// Platform consulted when no static A/AAAA records exist.
    pub platform: String,
    /// Records per kind.
    pub records: HashMap<RecordKind, Vec<ZoneRecord>>,
    /// Sum of weights per kind; 0 disables sampling for that kind.
    pub weight_sum: HashMap<RecordKind, u64>,
}

impl Label {
    /// First record of a kind, if any.
    pub fn first(&self, kind: RecordKind) -> Option<&ZoneRecord> {
        self.records.get(&kind).and_then(|records| records.first())
    }

    fn has(&self, kind: RecordKind) -> bool {
        self.records.get(&kind).is_some_and(|records| !records.is_empty())
    }

    /// Append a record, keeping the weight sum in step.
    pub fn push_record(&mut self, kind: RecordKind, record: ZoneRecord) {
        *self.weight_sum.entry(kind).or_insert(0) += record.weight;
        self.records.entry(kind).or_default().push(record);
    }

    /// Re-sort a kind weight-descending when it is weighted at all.
    pub fn sort_weighted(&mut self, kind: RecordKind) {
        if self.weight_sum.get(&kind).copied().unwrap_or(0) > 0 {
            if let Some(records) = self.records.get_mut(&kind) {
                records.sort_by(|a, b| b.weight.cmp(&a.weight));
            }
        }
    }

    /// Select the answer set for one query.
    ///
    /// Static record sets are sampled by weight (a zero sum returns the set
    /// unchanged; CNAME and alias are capped at one). A label with no static
    /// records of an address kind falls through to its platform pool, with
    /// the owner synthesized as `label.platform.`.
    pub fn picker<R: Rng + ?Sized>(
        &self,
        lookup: Lookup,
        max: usize,
        area: &str,
        pool: &PlatformPool,
        rng: &mut R,
    ) -> Vec<Record> {
        let kind = match lookup {
            Lookup::Any => {
                let mut out = Vec::new();
                for kind in self.records.keys() {
                    // The alias has no wire form; everything else fans out.
                    if *kind == RecordKind::Alias {
                        continue;
                    }
                    out.extend(self.picker(Lookup::Kind(*kind), max, area, pool, rng));
                }
                return out;
            }
            Lookup::Kind(kind) => kind,
        };

        if self.has(kind) {
            let records = &self.records[&kind];
            let sum = self.weight_sum.get(&kind).copied().unwrap_or(0);

            if sum == 0 {
                return records.iter().filter_map(ZoneRecord::to_wire).collect();
            }

            let max = match kind {
                RecordKind::Cname | RecordKind::Alias => 1,
                _ => max.min(records.len()),
            };

            let mut selector =
                WeightedSelector::new(records.iter().map(|r| (r, r.weight)).collect());
            let mut out = Vec::with_capacity(max);
            for _ in 0..max {
                match selector.pick(rng) {
                    Some(record) => out.extend(record.to_wire()),
                    None => break,
                }
            }
            return out;
        }

        let family = match kind {
            RecordKind::A => AddressFamily::V4,
            RecordKind::Aaaa => AddressFamily::V6,
            _ => return Vec::new(),
        };

        let addrs = pool.search(&self.platform, area, family, max, rng);
        if addrs.is_empty() {
            return Vec::new();
        }

        let owner = if self.name.is_empty() {
            format!("{}.", self.platform)
        } else {
            format!("{}.{}.", self.name, self.platform)
        };
        let Ok(owner) = Name::from_ascii(&owner) else {
            warn!(%owner, "platform answer owner is not a valid name");
            return Vec::new();
        };

        addrs
            .into_iter()
            .filter_map(|addr| {
                let rdata = match (family, addr) {
                    (AddressFamily::V4, std::net::IpAddr::V4(ip)) => RData::A(A::from(ip)),
                    (AddressFamily::V6, std::net::IpAddr::V6(ip)) => RData::AAAA(AAAA::from(ip)),
                    _ => return None,
                };
                let mut record = Record::from_rdata(owner.clone(), self.ttl, rdata);
                record.set_dns_class(DNSClass::IN);
                Some(record)
            })
            .collect()
    }
}

/// Zone-wide defaults and identity.
#[derive(Debug, Clone)]
pub struct ZoneOptions {
    /// SOA serial.
    pub serial: u32,
    /// Default record TTL.
    pub ttl: u32,
    /// Default answer cap.
    pub max_hosts: usize,
    /// SOA responsible party.
    pub contact: String,
}

/// An authoritative zone.
#[derive(Debug, Clone)]
pub struct Zone {
    /// Origin domain, without trailing dot.
    pub origin: String,
    /// Number of dotted labels in the origin.
    pub label_count: usize,
    /// Defaults applied to new labels.
    pub options: ZoneOptions,
    /// Platform tag; equal to the origin in current use.
    pub platform: String,
    /// Labels keyed by zone-relative name ("" for the root).
    pub labels: HashMap<String, Label>,
}

impl Zone {
    /// Default record TTL for zones that do not set one.
    pub const DEFAULT_TTL: u32 = 120;
    /// Default answer cap for zones that do not set one.
    pub const DEFAULT_MAX_HOSTS: usize = 2;

    /// New empty zone with standard defaults.
    pub fn new(name: &str) -> Self {
        Self {
            origin: name.to_string(),
            label_count: name.split('.').filter(|l| !l.is_empty()).count(),
            options: ZoneOptions {
                serial: 0,
                ttl: Self::DEFAULT_TTL,
                max_hosts: Self::DEFAULT_MAX_HOSTS,
                contact: format!("hostmaster.{name}"),
            },
            platform: name.to_string(),
            labels: HashMap::new(),
        }
    }

    /// Create an empty label inheriting the zone defaults.
    pub fn add_label(&mut self, key: &str) -> &mut Label {
        let key = key.to_lowercase();
        let label = Label {
            name: key.clone(),
            ttl: self.options.ttl,
            max_hosts: self.options.max_hosts,
            platform: self.platform.clone(),
            records: HashMap::new(),
            weight_sum: HashMap::new(),
        };
        self.labels.entry(key).or_insert(label)
    }

    /// Walk the targets and type priority list to find the answering label.
    ///
    /// Returns the matched label and the lookup that matched it, or the
    /// label at `key` (possibly absent) with no match: `(None, None)` is
    /// NXDOMAIN, `(Some, None)` is an empty NOERROR. Alias records are
    /// chased through the same walk; a key seen twice ends the chase.
    pub fn find_labels(
        &self,
        key: &str,
        targets: &[&str],
        priority: &[Lookup],
    ) -> (Option<&Label>, Option<Lookup>) {
        let mut seen = HashSet::new();
        self.find_labels_inner(key, targets, priority, &mut seen)
    }

    fn find_labels_inner<'z>(
        &'z self,
        key: &str,
        targets: &[&str],
        priority: &[Lookup],
        seen: &mut HashSet<String>,
    ) -> (Option<&'z Label>, Option<Lookup>) {
        for target in targets {
            let name = match *target {
                "@" => key.to_string(),
                target if key.is_empty() => target.to_string(),
                target => format!("{key}.{target}"),
            };

            let Some(label) = self.labels.get(&name) else {
                continue;
            };

            for lookup in priority {
                match lookup {
                    Lookup::Any => return (self.labels.get(key), Some(Lookup::Any)),
                    Lookup::Kind(RecordKind::Alias) => {
                        let Some(record) = label.first(RecordKind::Alias) else {
                            continue;
                        };
                        let RecordData::Alias(alias_target) = &record.data else {
                            continue;
                        };
                        if !seen.insert(name.clone()) {
                            warn!(zone = %self.origin, label = %name, "alias loop detected");
                            return (self.labels.get(key), None);
                        }
                        return self.find_labels_inner(alias_target, targets, priority, seen);
                    }
                    Lookup::Kind(kind) => {
                        if label.has(*kind) {
                            return (Some(label), Some(*lookup));
                        }
                    }
                }
            }
        }

        (self.labels.get(key), None)
    }

    /// Synthesize the root SOA from zone options, replacing any prior one.
    ///
    /// The primary NS is the first root NS target when present. Refresh,
    /// retry, expire and minimum are fixed; they are meaningless to a server
    /// that never transfers zones.
    pub fn setup_soa(&mut self) {
        let origin = self.origin.clone();
        let serial = self.options.serial;
        let contact = self.options.contact.clone();
        let soa_ttl = (self.options.ttl.saturating_mul(10)).clamp(600, 3600);

        if !self.labels.contains_key("") {
            warn!(zone = %origin, "no root records; synthesizing an empty root label");
            self.add_label("");
        }

        let primary_ns = self
            .labels
            .get("")
            .and_then(|root| root.first(RecordKind::Ns))
            .and_then(|record| match &record.data {
                RecordData::Ns(name) => Some(name.clone()),
                _ => None,
            })
            .unwrap_or_else(|| Name::from_ascii("ns.").unwrap_or_default());

        let rname = Name::from_ascii(format!("{}.", contact.trim_end_matches('.')))
            .unwrap_or_else(|_| Name::root());
        let owner = Name::from_ascii(format!("{origin}."))
            .unwrap_or_else(|_| Name::root());

        let soa = SOA::new(primary_ns, rname, serial, 5400, 5400, 1_209_600, 3600);
        let record = ZoneRecord {
            name: owner,
            ttl: soa_ttl,
            weight: 0,
            data: RecordData::Soa(soa),
        };

        let root = self.labels.get_mut("").expect("root label exists");
        root.records.insert(RecordKind::Soa, vec![record]);
        root.weight_sum.insert(RecordKind::Soa, 0);
    }

    /// The zone SOA as a wire record, for authority sections.
    pub fn soa_record(&self) -> Option<Record> {
        self.labels
            .get("")?
            .first(RecordKind::Soa)?
            .to_wire()
    }
}

/// Pack a TXT-shaped payload into DNS character-strings.
fn encode_character_strings(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 255 + 1);
    for chunk in bytes.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_pool() -> PlatformPool {
        PlatformPool::new(HealthRegistry::new())
    }

    fn a_record(zone: &Zone, label: &str, ip: &str, weight: u64) -> ZoneRecord {
        let owner = if label.is_empty() {
            format!("{}.", zone.origin)
        } else {
            format!("{}.{}.", label, zone.origin)
        };
        ZoneRecord {
            name: Name::from_ascii(&owner).unwrap(),
            ttl: zone.options.ttl,
            weight,
            data: RecordData::A(ip.parse().unwrap()),
        }
    }

    fn zone_with_a(records: &[(&str, u64)]) -> Zone {
        let mut zone = Zone::new("example.com");
        zone.add_label("www");
        for (ip, weight) in records {
            let record = a_record(&zone, "www", ip, *weight);
            zone.labels
                .get_mut("www")
                .unwrap()
                .push_record(RecordKind::A, record);
        }
        zone.labels.get_mut("www").unwrap().sort_weighted(RecordKind::A);
        zone.setup_soa();
        zone
    }

    #[test]
    fn new_zone_defaults() {
        let zone = Zone::new("example.com");
        assert_eq!(zone.label_count, 2);
        assert_eq!(zone.options.ttl, 120);
        assert_eq!(zone.options.max_hosts, 2);
        assert_eq!(zone.options.contact, "hostmaster.example.com");
        assert_eq!(zone.platform, "example.com");
    }

    #[test]
    fn soa_ttl_is_clamped() {
        let mut zone = Zone::new("example.com");
        zone.setup_soa();
        // 120 * 10 = 1200, inside the clamp window.
        assert_eq!(zone.labels[""].first(RecordKind::Soa).unwrap().ttl, 1200);

        zone.options.ttl = 3600;
        zone.setup_soa();
        assert_eq!(zone.labels[""].first(RecordKind::Soa).unwrap().ttl, 3600);

        zone.options.ttl = 10;
        zone.setup_soa();
        assert_eq!(zone.labels[""].first(RecordKind::Soa).unwrap().ttl, 600);
    }

    #[test]
    fn soa_uses_first_root_ns_as_primary() {
        let mut zone = Zone::new("example.com");
        zone.add_label("");
        let ns = ZoneRecord {
            name: Name::from_ascii("example.com.").unwrap(),
            ttl: 86400,
            weight: 0,
            data: RecordData::Ns(Name::from_ascii("ns1.example.com.").unwrap()),
        };
        zone.labels.get_mut("").unwrap().push_record(RecordKind::Ns, ns);
        zone.setup_soa();

        let soa = zone.soa_record().unwrap();
        let RData::SOA(soa) = soa.data() else { panic!("not SOA") };
        assert_eq!(soa.mname().to_ascii(), "ns1.example.com.");
        assert_eq!(soa.refresh(), 5400);
        assert_eq!(soa.expire(), 1_209_600);
    }

    #[test]
    fn weight_sum_matches_records() {
        let zone = zone_with_a(&[("1.1.1.1", 3), ("2.2.2.2", 1)]);
        let label = &zone.labels["www"];
        let sum: u64 = label.records[&RecordKind::A].iter().map(|r| r.weight).sum();
        assert_eq!(label.weight_sum[&RecordKind::A], sum);
        // Weight-descending after sort_weighted.
        assert!(label.records[&RecordKind::A][0].weight >= label.records[&RecordKind::A][1].weight);
    }

    #[test]
    fn find_labels_direct_hit() {
        let zone = zone_with_a(&[("1.2.3.4", 0)]);
        let (label, matched) = zone.find_labels(
            "www",
            &["@"],
            &[Lookup::Kind(RecordKind::Alias), Lookup::Kind(RecordKind::Cname), Lookup::Kind(RecordKind::A)],
        );
        assert_eq!(label.unwrap().name, "www");
        assert_eq!(matched, Some(Lookup::Kind(RecordKind::A)));
    }

    #[test]
    fn find_labels_miss_is_nxdomain() {
        let zone = zone_with_a(&[("1.2.3.4", 0)]);
        let (label, matched) = zone.find_labels("missing", &["@"], &[Lookup::Kind(RecordKind::A)]);
        assert!(label.is_none());
        assert!(matched.is_none());
    }

    #[test]
    fn find_labels_follows_alias() {
        let mut zone = zone_with_a(&[("1.2.3.4", 0)]);
        zone.add_label("app");
        let alias = ZoneRecord {
            name: Name::from_ascii("app.example.com.").unwrap(),
            ttl: 120,
            weight: 0,
            data: RecordData::Alias("www".to_string()),
        };
        zone.labels.get_mut("app").unwrap().push_record(RecordKind::Alias, alias);

        let (label, matched) = zone.find_labels(
            "app",
            &["@"],
            &[Lookup::Kind(RecordKind::Alias), Lookup::Kind(RecordKind::Cname), Lookup::Kind(RecordKind::A)],
        );
        assert_eq!(label.unwrap().name, "www");
        assert_eq!(matched, Some(Lookup::Kind(RecordKind::A)));
    }

    #[test]
    fn alias_loop_ends_without_answer() {
        let mut zone = Zone::new("example.com");
        for (from, to) in [("a", "b"), ("b", "a")] {
            zone.add_label(from);
            let alias = ZoneRecord {
                name: Name::from_ascii(format!("{from}.example.com.")).unwrap(),
                ttl: 120,
                weight: 0,
                data: RecordData::Alias(to.to_string()),
            };
            zone.labels.get_mut(from).unwrap().push_record(RecordKind::Alias, alias);
        }
        zone.setup_soa();

        let (label, matched) = zone.find_labels(
            "a",
            &["@"],
            &[Lookup::Kind(RecordKind::Alias), Lookup::Kind(RecordKind::A)],
        );
        // The chase ends on the repeated key with no matched type.
        assert!(label.is_some());
        assert!(matched.is_none());
    }

    #[test]
    fn picker_zero_weight_returns_whole_set() {
        let zone = zone_with_a(&[("1.2.3.4", 0)]);
        let mut rng = StdRng::seed_from_u64(1);
        let answers = zone.labels["www"].picker(
            Lookup::Kind(RecordKind::A),
            1,
            "@",
            &empty_pool(),
            &mut rng,
        );
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn picker_caps_at_max_hosts() {
        let zone = zone_with_a(&[("1.1.1.1", 2), ("2.2.2.2", 1), ("3.3.3.3", 1)]);
        let mut rng = StdRng::seed_from_u64(1);
        let answers = zone.labels["www"].picker(
            Lookup::Kind(RecordKind::A),
            2,
            "@",
            &empty_pool(),
            &mut rng,
        );
        assert_eq!(answers.len(), 2);
    }

    #[test]
    fn picker_forces_single_cname() {
        let mut zone = Zone::new("example.com");
        zone.add_label("web");
        for (target, weight) in [("a.example.com.", 2u64), ("b.example.com.", 1)] {
            let record = ZoneRecord {
                name: Name::from_ascii("web.example.com.").unwrap(),
                ttl: 120,
                weight,
                data: RecordData::Cname(Name::from_ascii(target).unwrap()),
            };
            zone.labels.get_mut("web").unwrap().push_record(RecordKind::Cname, record);
        }
        zone.labels.get_mut("web").unwrap().sort_weighted(RecordKind::Cname);

        let mut rng = StdRng::seed_from_u64(1);
        let answers = zone.labels["web"].picker(
            Lookup::Kind(RecordKind::Cname),
            5,
            "@",
            &empty_pool(),
            &mut rng,
        );
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn picker_weighted_tie_break_distribution() {
        // 3:1 weights, one answer per query: the heavy record should win
        // between 60% and 90% of 10,000 seeded draws.
        let zone = zone_with_a(&[("10.0.0.1", 3), ("10.0.0.2", 1)]);
        let pool = empty_pool();
        let mut rng = StdRng::seed_from_u64(42);

        let mut heavy = 0usize;
        for _ in 0..10_000 {
            let answers = zone.labels["www"].picker(
                Lookup::Kind(RecordKind::A),
                1,
                "@",
                &pool,
                &mut rng,
            );
            assert_eq!(answers.len(), 1);
            if let RData::A(a) = answers[0].data() {
                if std::net::Ipv4Addr::from(*a) == std::net::Ipv4Addr::new(10, 0, 0, 1) {
                    heavy += 1;
                }
            }
        }

        let ratio = heavy as f64 / 10_000.0;
        assert!((0.60..=0.90).contains(&ratio), "heavy ratio {ratio}");
    }

    #[test]
    fn picker_any_fans_out_and_skips_alias() {
        let mut zone = zone_with_a(&[("1.2.3.4", 0)]);
        let txt = ZoneRecord {
            name: Name::from_ascii("www.example.com.").unwrap(),
            ttl: 120,
            weight: 0,
            data: RecordData::Txt("hello".to_string()),
        };
        let alias = ZoneRecord {
            name: Name::from_ascii("www.example.com.").unwrap(),
            ttl: 120,
            weight: 0,
            data: RecordData::Alias("elsewhere".to_string()),
        };
        let label = zone.labels.get_mut("www").unwrap();
        label.push_record(RecordKind::Txt, txt);
        label.push_record(RecordKind::Alias, alias);

        let mut rng = StdRng::seed_from_u64(1);
        let answers = zone.labels["www"].picker(Lookup::Any, 5, "@", &empty_pool(), &mut rng);

        let types: Vec<RecordType> = answers.iter().map(|r| r.record_type()).collect();
        assert!(types.contains(&RecordType::A));
        assert!(types.contains(&RecordType::TXT));
        assert!(!types.contains(&RecordType::Unknown(4)));
    }

    #[test]
    fn spf_payload_keeps_type_99() {
        let record = ZoneRecord {
            name: Name::from_ascii("example.com.").unwrap(),
            ttl: 120,
            weight: 0,
            data: RecordData::Spf("v=spf1 -all".to_string()),
        };
        let wire = record.to_wire().unwrap();
        assert_eq!(wire.record_type(), RecordType::Unknown(99));
    }
}
