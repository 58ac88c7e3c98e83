//! Zone file ingestion: JSON documents into the in-memory zone model.
//!
//! The file format is weakly typed in places (weights may be numbers or
//! strings, several record types accept more than one shape), so the loader
//! parses structured parts with serde derive and the polymorphic leaves from
//! raw values. Anything malformed is a fatal load error for the zone; the
//! reloader keeps the previously published zone in that case.

use hickory_proto::rr::Name;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::warn;

use crate::error::GslbError;
use crate::zone::{RecordData, RecordKind, Zone, ZoneRecord};

/// TTL floor for NS records.
const NS_TTL_FLOOR: u32 = 86400;

#[derive(Debug, Deserialize)]
struct ZoneDoc {
    #[serde(default)]
    ttl: Option<Value>,
    #[serde(default)]
    serial: Option<Value>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    max_hosts: Option<Value>,
    #[serde(default)]
    data: HashMap<String, HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct MxEntry {
    mx: String,
    #[serde(default)]
    preference: Option<Value>,
    #[serde(default)]
    weight: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SrvEntry {
    target: String,
    #[serde(default)]
    port: Option<Value>,
    #[serde(default)]
    srv_weight: Option<Value>,
    #[serde(default)]
    priority: Option<Value>,
}

/// Load a zone from a file, defaulting the serial to the file mtime.
pub fn load_zone_file(name: &str, path: &Path) -> Result<Zone, GslbError> {
    let mtime_serial = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0);

    let data = std::fs::read(path)?;
    parse_zone(name, &data, mtime_serial)
}

/// Parse zone JSON into a published-ready `Zone`.
pub fn parse_zone(name: &str, data: &[u8], default_serial: u32) -> Result<Zone, GslbError> {
    let doc: ZoneDoc =
        serde_json::from_slice(data).map_err(|err| GslbError::zone(name, err.to_string()))?;

    let mut zone = Zone::new(name);
    zone.options.serial = default_serial;

    if let Some(ttl) = &doc.ttl {
        zone.options.ttl = to_int(ttl).ok_or_else(|| GslbError::zone(name, "bad ttl"))? as u32;
    }
    if let Some(serial) = &doc.serial {
        zone.options.serial =
            to_int(serial).ok_or_else(|| GslbError::zone(name, "bad serial"))? as u32;
    }
    if let Some(contact) = &doc.contact {
        zone.options.contact = contact.clone();
    }
    if let Some(max_hosts) = &doc.max_hosts {
        zone.options.max_hosts =
            to_int(max_hosts).ok_or_else(|| GslbError::zone(name, "bad max_hosts"))? as usize;
    }

    for (label_key, body) in &doc.data {
        load_label(&mut zone, label_key, body)?;
    }

    create_suffix_labels(&mut zone);
    apply_label_ttls(&mut zone);
    zone.setup_soa();

    Ok(zone)
}

fn load_label(
    zone: &mut Zone,
    label_key: &str,
    body: &HashMap<String, Value>,
) -> Result<(), GslbError> {
    let origin = zone.origin.clone();
    let label_key = label_key.to_lowercase();

    // Label options first; the TTL pass later applies the label TTL to the
    // records themselves.
    {
        let label = zone.add_label(&label_key);
        if let Some(ttl) = body.get("ttl") {
            label.ttl = to_int(ttl).ok_or_else(|| {
                GslbError::zone(&origin, format!("label '{label_key}': bad ttl"))
            })? as u32;
        }
        if let Some(max_hosts) = body.get("max_hosts") {
            label.max_hosts = to_int(max_hosts).ok_or_else(|| {
                GslbError::zone(&origin, format!("label '{label_key}': bad max_hosts"))
            })? as usize;
        }
    }

    for (type_key, rdata) in body {
        if type_key == "ttl" || type_key == "max_hosts" {
            continue;
        }
        let Some(kind) = RecordKind::from_key(type_key) else {
            warn!(zone = %origin, label = %label_key, rtype = %type_key,
                "unsupported record type");
            continue;
        };
        if rdata.is_null() {
            continue;
        }

        let owner = owner_name(&origin, &label_key)?;
        let records = build_records(&origin, &label_key, owner, kind, rdata)?;

        if let Some(label) = zone.labels.get_mut(&label_key) {
            for record in records {
                label.push_record(kind, record);
            }
            label.sort_weighted(kind);
        }
    }

    Ok(())
}

fn build_records(
    origin: &str,
    label_key: &str,
    owner: Name,
    kind: RecordKind,
    rdata: &Value,
) -> Result<Vec<ZoneRecord>, GslbError> {
    let bad = |reason: String| GslbError::zone(origin, format!("label '{label_key}': {reason}"));
    let record = |ttl: u32, weight: u64, data: RecordData| ZoneRecord {
        name: owner.clone(),
        ttl,
        weight,
        data,
    };

    let mut out = Vec::new();

    match kind {
        RecordKind::A | RecordKind::Aaaa | RecordKind::Ptr => {
            for pair in weighted_pairs(rdata).map_err(&bad)? {
                let (value, weight) = pair;
                let data = match kind {
                    RecordKind::A => RecordData::A(
                        value
                            .parse()
                            .map_err(|_| bad(format!("bad A record '{value}'")))?,
                    ),
                    RecordKind::Aaaa => RecordData::Aaaa(
                        value
                            .parse()
                            .map_err(|_| bad(format!("bad AAAA record '{value}'")))?,
                    ),
                    _ => RecordData::Ptr(absolute_name(&value).map_err(|_| {
                        bad(format!("bad PTR target '{value}'"))
                    })?),
                };
                out.push(record(0, weight, data));
            }
        }

        RecordKind::Cname => {
            let pairs = match rdata {
                Value::String(target) => vec![(target.clone(), 0)],
                Value::Array(_) => weighted_pairs(rdata).map_err(&bad)?,
                other => return Err(bad(format!("bad cname shape: {other}"))),
            };
            for (target, weight) in pairs {
                let target = qualified_name(&target, origin)
                    .map_err(|_| bad(format!("bad cname target '{target}'")))?;
                out.push(record(0, weight, RecordData::Cname(target)));
            }
        }

        RecordKind::Alias => {
            let Value::String(target) = rdata else {
                return Err(bad("alias target must be a string".to_string()));
            };
            // Alias targets are zone-relative label keys, never FQDNs.
            out.push(record(0, 0, RecordData::Alias(target.to_lowercase())));
        }

        RecordKind::Mx => {
            let Value::Array(entries) = rdata else {
                return Err(bad("mx must be a list".to_string()));
            };
            for entry in entries {
                let entry: MxEntry = serde_json::from_value(entry.clone())
                    .map_err(|err| bad(format!("bad mx entry: {err}")))?;
                let exchange = absolute_name(&entry.mx)
                    .map_err(|_| bad(format!("bad mx exchange '{}'", entry.mx)))?;
                let preference = opt_int(&entry.preference).map_err(&bad)? as u16;
                let weight = opt_int(&entry.weight).map_err(&bad)? as u64;
                out.push(record(0, weight, RecordData::Mx { preference, exchange }));
            }
        }

        RecordKind::Ns => {
            let targets: Vec<String> = match rdata {
                Value::String(target) => vec![target.clone()],
                Value::Array(entries) => entries
                    .iter()
                    .map(|entry| match entry {
                        Value::String(target) => Ok(target.clone()),
                        other => Err(bad(format!("bad ns entry: {other}"))),
                    })
                    .collect::<Result<_, _>>()?,
                Value::Object(map) => {
                    // Map syntax: keys are the server names, values are
                    // descriptions we do not support.
                    let has_desc = map
                        .values()
                        .any(|v| !v.is_null() && v.as_str().is_none_or(|s| !s.is_empty()));
                    if has_desc {
                        warn!(zone = %origin, label = %label_key,
                            "NS records with names syntax not supported");
                    }
                    map.keys().cloned().collect()
                }
                other => return Err(bad(format!("bad ns shape: {other}"))),
            };
            for target in targets {
                let ns = qualified_name(&target, origin)
                    .map_err(|_| bad(format!("bad ns target '{target}'")))?;
                out.push(record(NS_TTL_FLOOR, 0, RecordData::Ns(ns)));
            }
        }

        RecordKind::Txt | RecordKind::Spf => {
            let field = if kind == RecordKind::Txt { "txt" } else { "spf" };
            let entries: Vec<&Value> = match rdata {
                Value::Array(list) => list.iter().collect(),
                single => vec![single],
            };
            for entry in entries {
                let (text, weight) = match entry {
                    Value::String(text) => (text.clone(), 0),
                    Value::Object(map) => {
                        let text = map
                            .get(field)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let weight = match map.get("weight") {
                            Some(value) => {
                                to_int(value).ok_or_else(|| bad("bad weight".to_string()))? as u64
                            }
                            None => 0,
                        };
                        (text, weight)
                    }
                    other => return Err(bad(format!("bad {field} shape: {other}"))),
                };
                if text.is_empty() {
                    warn!(zone = %origin, label = %label_key,
                        "zero length {field} record");
                    continue;
                }
                let data = if kind == RecordKind::Txt {
                    RecordData::Txt(text)
                } else {
                    RecordData::Spf(text)
                };
                out.push(record(0, weight, data));
            }
        }

        RecordKind::Srv => {
            let Value::Array(entries) = rdata else {
                return Err(bad("srv must be a list".to_string()));
            };
            for entry in entries {
                let entry: SrvEntry = serde_json::from_value(entry.clone())
                    .map_err(|err| bad(format!("bad srv entry: {err}")))?;
                let target = qualified_name(&entry.target, origin)
                    .map_err(|_| bad(format!("bad srv target '{}'", entry.target)))?;
                out.push(record(
                    0,
                    0,
                    RecordData::Srv {
                        priority: opt_int(&entry.priority).map_err(&bad)? as u16,
                        weight: opt_int(&entry.srv_weight).map_err(&bad)? as u16,
                        port: opt_int(&entry.port).map_err(&bad)? as u16,
                        target,
                    },
                ));
            }
        }

        RecordKind::Soa => {
            // The SOA is always synthesized; a literal one is ignored.
            warn!(zone = %origin, label = %label_key, "ignoring explicit SOA record");
        }
    }

    Ok(out)
}

/// Every dotted label implies its suffixes; create the missing ones empty.
fn create_suffix_labels(zone: &mut Zone) {
    let keys: Vec<String> = zone.labels.keys().cloned().collect();
    for key in keys {
        if !key.contains('.') {
            continue;
        }
        let parts: Vec<&str> = key.split('.').collect();
        for i in 1..parts.len() {
            let suffix = parts[i..].join(".");
            if !zone.labels.contains_key(&suffix) {
                zone.add_label(&suffix);
            }
        }
    }
}

/// Apply each label's TTL to the records it owns; NS keeps its floor.
fn apply_label_ttls(zone: &mut Zone) {
    for label in zone.labels.values_mut() {
        if label.ttl == 0 {
            continue;
        }
        let ttl = label.ttl;
        for (kind, records) in label.records.iter_mut() {
            let ttl = match kind {
                RecordKind::Ns => ttl.max(NS_TTL_FLOOR),
                _ => ttl,
            };
            for record in records {
                record.ttl = ttl;
            }
        }
    }
}

fn owner_name(origin: &str, label_key: &str) -> Result<Name, GslbError> {
    let owner = if label_key.is_empty() {
        format!("{origin}.")
    } else {
        format!("{label_key}.{origin}.")
    };
    Name::from_ascii(&owner)
        .map_err(|_| GslbError::zone(origin, format!("bad owner name '{owner}'")))
}

/// Qualify a target inside the zone unless it is already dot-terminated.
fn qualified_name(target: &str, origin: &str) -> Result<Name, hickory_proto::ProtoError> {
    if target.ends_with('.') {
        Name::from_ascii(target)
    } else {
        Name::from_ascii(format!("{target}.{origin}."))
    }
}

/// Make a name absolute without qualifying it inside the zone.
fn absolute_name(target: &str) -> Result<Name, hickory_proto::ProtoError> {
    if target.ends_with('.') {
        Name::from_ascii(target)
    } else {
        Name::from_ascii(format!("{target}."))
    }
}

/// `[value, weight]` pairs; a lone `[value]` or a bare flat pair also count.
fn weighted_pairs(rdata: &Value) -> Result<Vec<(String, u64)>, String> {
    let Value::Array(items) = rdata else {
        return Err(format!("expected a list, got {rdata}"));
    };

    // Single form: the array itself is one [value, weight] pair.
    if let Some(Value::String(_)) = items.first() {
        return Ok(vec![one_pair(items)?]);
    }

    items
        .iter()
        .map(|item| match item {
            Value::Array(pair) => one_pair(pair),
            other => Err(format!("expected [value, weight], got {other}")),
        })
        .collect()
}

fn one_pair(pair: &[Value]) -> Result<(String, u64), String> {
    let value = pair
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| "record value must be a string".to_string())?;
    let weight = match pair.get(1) {
        Some(weight) => to_int(weight).ok_or_else(|| format!("bad weight {weight}"))? as u64,
        None => 0,
    };
    Ok((value.to_string(), weight))
}

fn opt_int(value: &Option<Value>) -> Result<i64, String> {
    match value {
        Some(value) => to_int(value).ok_or_else(|| format!("bad integer {value}")),
        None => Ok(0),
    }
}

/// Integers arrive as JSON numbers or as decimal strings.
fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
