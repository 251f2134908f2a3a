//! In-memory broker used by the integration tests.
//!
//! Decodes the framed requests the client sends, keeps a little cluster
//! state (topics, SCRAM credentials) and answers through the response sink
//! exactly like a socket transport would.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use kafkaesque_admin::prelude::*;

// ============================================================================
// Wire helpers
// ============================================================================

/// Minimal big-endian reader for request bodies.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    pub fn i8(&mut self) -> i8 {
        self.take(1)[0] as i8
    }

    pub fn i16(&mut self) -> i16 {
        i16::from_be_bytes(self.take(2).try_into().unwrap())
    }

    pub fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    pub fn i64(&mut self) -> i64 {
        i64::from_be_bytes(self.take(8).try_into().unwrap())
    }

    pub fn uvarint(&mut self) -> u32 {
        let mut value = 0u32;
        let mut shift = 0;
        loop {
            let b = self.take(1)[0];
            value |= ((b & 0x7F) as u32) << shift;
            if b & 0x80 == 0 {
                return value;
            }
            shift += 7;
        }
    }

    pub fn nullable_string(&mut self) -> Option<String> {
        let len = self.i16();
        if len < 0 {
            return None;
        }
        Some(String::from_utf8(self.take(len as usize).to_vec()).unwrap())
    }

    pub fn string(&mut self) -> String {
        self.nullable_string().unwrap()
    }

    pub fn compact_string(&mut self) -> String {
        let len = self.uvarint() as usize - 1;
        String::from_utf8(self.take(len).to_vec()).unwrap()
    }

    pub fn compact_bytes(&mut self) -> Vec<u8> {
        let len = self.uvarint() as usize - 1;
        self.take(len).to_vec()
    }

    /// Compact array length, `None` for null.
    pub fn compact_len(&mut self) -> Option<usize> {
        match self.uvarint() {
            0 => None,
            n => Some(n as usize - 1),
        }
    }

    pub fn skip_tagged_fields(&mut self) {
        let count = self.uvarint();
        for _ in 0..count {
            self.uvarint();
            let size = self.uvarint() as usize;
            self.take(size);
        }
    }
}

/// Big-endian writer for response bodies.
#[derive(Default)]
pub struct Writer(pub Vec<u8>);

impl Writer {
    pub fn i8(&mut self, v: i8) -> &mut Self {
        self.0.push(v as u8);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn uvarint(&mut self, mut v: u32) -> &mut Self {
        while v >= 0x80 {
            self.0.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.0.push(v as u8);
        self
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.i16(s.len() as i16);
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    pub fn nullable_string(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.string(s),
            None => self.i16(-1),
        }
    }

    pub fn compact_string(&mut self, s: &str) -> &mut Self {
        self.uvarint(s.len() as u32 + 1);
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    pub fn compact_nullable_string(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.compact_string(s),
            None => self.uvarint(0),
        }
    }

    pub fn tagged(&mut self) -> &mut Self {
        self.uvarint(0)
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.0)
    }
}

/// Decoded request header.
pub struct Header {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

/// Split a framed request into header and body reader.
pub fn read_request(payload: &[u8]) -> (Header, Reader<'_>) {
    let mut r = Reader::new(payload);
    let size = r.i32() as usize;
    assert_eq!(size, payload.len() - 4, "frame size prefix");
    let api_key = ApiKey::from(r.i16());
    let api_version = r.i16();
    let correlation_id = r.i32();
    let client_id = r.nullable_string();
    if matches!(
        api_key,
        ApiKey::DescribeUserScramCredentials | ApiKey::AlterUserScramCredentials
    ) {
        r.skip_tagged_fields();
    }
    (
        Header {
            api_key,
            api_version,
            correlation_id,
            client_id,
        },
        r,
    )
}

/// Start a response: correlation id plus header tagged fields when flexible.
pub fn response_header(correlation_id: i32, flexible: bool) -> Writer {
    let mut w = Writer::default();
    w.i32(correlation_id);
    if flexible {
        w.tagged();
    }
    w
}

// ============================================================================
// Mock broker
// ============================================================================

/// What the mock advertises in ApiVersions.
pub const ADVERTISED: &[(ApiKey, i16, i16)] = &[
    (ApiKey::ListOffsets, 0, 7),
    (ApiKey::ApiVersions, 0, 3),
    (ApiKey::CreateTopics, 0, 7),
    (ApiKey::DeleteTopics, 0, 6),
    (ApiKey::DescribeUserScramCredentials, 0, 0),
    (ApiKey::AlterUserScramCredentials, 0, 0),
];

#[derive(Default)]
struct ClusterState {
    topics: BTreeSet<String>,
    /// user -> mechanism -> iterations
    credentials: BTreeMap<String, BTreeMap<i8, i32>>,
}

#[derive(Default)]
pub struct MockBroker {
    state: Mutex<ClusterState>,
    /// Requests seen, as (broker, api key, correlation id).
    pub requests: Mutex<Vec<(BrokerId, ApiKey, i32)>>,
    /// Answer this many topic requests with NotController first.
    pub not_controller_replies: AtomicUsize,
    /// Accept requests but never answer them.
    pub hang: AtomicBool,
}

impl MockBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self, api_key: ApiKey) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == api_key)
            .count()
    }

    pub fn brokers_for(&self, api_key: ApiKey) -> Vec<BrokerId> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == api_key)
            .map(|(b, _, _)| *b)
            .collect()
    }

    pub fn has_topic(&self, name: &str) -> bool {
        self.state.lock().unwrap().topics.contains(name)
    }

    fn handle(&self, broker: BrokerId, payload: &[u8]) -> Bytes {
        let (header, mut body) = read_request(payload);
        match header.api_key {
            ApiKey::ApiVersions => self.api_versions(&header),
            ApiKey::CreateTopics => self.create_topics(&header, &mut body),
            ApiKey::ListOffsets => self.list_offsets(broker, &header, &mut body),
            ApiKey::DescribeUserScramCredentials => self.describe_scram(&header, &mut body),
            ApiKey::AlterUserScramCredentials => self.alter_scram(&header, &mut body),
            other => panic!("mock broker does not handle {}", other),
        }
    }

    fn api_versions(&self, header: &Header) -> Bytes {
        let mut w = response_header(header.correlation_id, false);
        w.i16(0).i32(ADVERTISED.len() as i32);
        for (key, min, max) in ADVERTISED {
            w.i16((*key).into()).i16(*min).i16(*max);
        }
        if header.api_version >= 1 {
            w.i32(0);
        }
        w.into_bytes()
    }

    fn create_topics(&self, header: &Header, r: &mut Reader<'_>) -> Bytes {
        let mut names = Vec::new();
        for _ in 0..r.i32() {
            names.push(r.string());
            r.i32();
            r.i16();
            for _ in 0..r.i32() {
                r.i32();
                for _ in 0..r.i32() {
                    r.i32();
                }
            }
            for _ in 0..r.i32() {
                r.string();
                r.nullable_string();
            }
        }
        r.i32();
        let validate_only = header.api_version >= 1 && r.i8() != 0;

        let not_controller = self
            .not_controller_replies
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let mut state = self.state.lock().unwrap();
        let mut w = response_header(header.correlation_id, false);
        if header.api_version >= 2 {
            w.i32(0);
        }
        w.i32(names.len() as i32);
        for name in names {
            let code = if not_controller {
                41
            } else if state.topics.contains(&name) {
                36
            } else {
                if !validate_only {
                    state.topics.insert(name.clone());
                }
                0
            };
            w.string(&name).i16(code);
            if header.api_version >= 1 {
                w.nullable_string(None);
            }
        }
        w.into_bytes()
    }

    /// Offsets are `1000 * broker + partition`. A broker that does not lead
    /// a partition answers NotLeaderForPartition for it.
    fn list_offsets(&self, broker: BrokerId, header: &Header, r: &mut Reader<'_>) -> Bytes {
        assert_eq!(r.i32(), -1, "replica id");
        if header.api_version >= 2 {
            r.i8();
        }
        let mut topics = Vec::new();
        for _ in 0..r.i32() {
            let name = r.string();
            let mut partitions = Vec::new();
            for _ in 0..r.i32() {
                let partition = r.i32();
                r.i64();
                partitions.push(partition);
            }
            topics.push((name, partitions));
        }

        let mut w = response_header(header.correlation_id, false);
        w.i32(0).i32(topics.len() as i32);
        for (name, partitions) in topics {
            w.string(&name).i32(partitions.len() as i32);
            for p in partitions {
                if p % 2 + 1 == broker.value() {
                    w.i32(p)
                        .i16(0)
                        .i64(-1)
                        .i64(1000 * broker.value() as i64 + p as i64);
                } else {
                    w.i32(p).i16(6).i64(-1).i64(-1);
                }
            }
        }
        w.into_bytes()
    }

    fn describe_scram(&self, header: &Header, r: &mut Reader<'_>) -> Bytes {
        let users = r.compact_len().map(|n| {
            (0..n)
                .map(|_| {
                    let name = r.compact_string();
                    r.skip_tagged_fields();
                    name
                })
                .collect::<Vec<_>>()
        });
        r.skip_tagged_fields();

        let state = self.state.lock().unwrap();
        let users: Vec<String> = users.unwrap_or_else(|| state.credentials.keys().cloned().collect());

        let mut w = response_header(header.correlation_id, true);
        w.i32(0).i16(0).compact_nullable_string(None);
        w.uvarint(users.len() as u32 + 1);
        for user in users {
            w.compact_string(&user);
            match state.credentials.get(&user) {
                Some(creds) => {
                    w.i16(0).compact_nullable_string(None);
                    w.uvarint(creds.len() as u32 + 1);
                    for (mechanism, iterations) in creds {
                        w.i8(*mechanism).i32(*iterations).tagged();
                    }
                }
                None => {
                    w.i16(91)
                        .compact_nullable_string(Some("Attempt to describe a user credential that does not exist"))
                        .uvarint(1);
                }
            }
            w.tagged();
        }
        w.tagged();
        w.into_bytes()
    }

    fn alter_scram(&self, header: &Header, r: &mut Reader<'_>) -> Bytes {
        let mut results: Vec<(String, i16)> = Vec::new();
        let mut record = |user: String, code: i16| match results.iter_mut().find(|(u, _)| *u == user) {
            Some((_, existing)) if *existing == 0 => *existing = code,
            Some(_) => {}
            None => results.push((user, code)),
        };

        let mut state = self.state.lock().unwrap();
        for _ in 0..r.compact_len().unwrap_or(0) {
            let user = r.compact_string();
            let mechanism = r.i8();
            r.skip_tagged_fields();
            let removed = state
                .credentials
                .get_mut(&user)
                .and_then(|creds| creds.remove(&mechanism))
                .is_some();
            if state.credentials.get(&user).is_some_and(|c| c.is_empty()) {
                state.credentials.remove(&user);
            }
            record(user, if removed { 0 } else { 91 });
        }
        for _ in 0..r.compact_len().unwrap_or(0) {
            let user = r.compact_string();
            let mechanism = r.i8();
            let iterations = r.i32();
            let salt = r.compact_bytes();
            let salted_password = r.compact_bytes();
            r.skip_tagged_fields();
            assert!(!salt.is_empty() && !salted_password.is_empty());
            state
                .credentials
                .entry(user.clone())
                .or_default()
                .insert(mechanism, iterations);
            record(user, 0);
        }
        r.skip_tagged_fields();

        let mut w = response_header(header.correlation_id, true);
        w.i32(0).uvarint(results.len() as u32 + 1);
        for (user, code) in results {
            w.compact_string(&user).i16(code).compact_nullable_string(None).tagged();
        }
        w.tagged();
        w.into_bytes()
    }
}

impl BrokerTransport for MockBroker {
    fn send(
        &self,
        broker: BrokerId,
        request: OutboundRequest,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<()> {
        self.requests.lock().unwrap().push((
            broker,
            request.api_key,
            request.correlation_id.value(),
        ));
        if self.hang.load(Ordering::SeqCst) {
            return Ok(());
        }
        let response = self.handle(broker, &request.payload);
        // answer from another task, like a socket reader would
        tokio::spawn(async move {
            sink.on_response(request.correlation_id, Ok(response));
        });
        Ok(())
    }
}

/// Controller is broker 1; partition `p` is led by broker `p % 2 + 1`.
///
/// While `stale_leader_lookups` is non-zero, leader lookups answer broker 1.
#[derive(Default)]
pub struct MockResolver {
    pub resolutions: AtomicUsize,
    pub stale_leader_lookups: AtomicUsize,
}

#[async_trait]
impl BrokerResolver for MockResolver {
    async fn resolve(&self, target: &RequestTarget) -> Result<BrokerId> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(match target {
            RequestTarget::Leader { .. }
                if self
                    .stale_leader_lookups
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok() =>
            {
                BrokerId::new(1)
            }
            RequestTarget::Leader { partition, .. } => BrokerId::new(partition % 2 + 1),
            RequestTarget::Broker(id) => *id,
            _ => BrokerId::new(1),
        })
    }
}

#[derive(Default)]
pub struct MockRefresher {
    pub refreshes: AtomicUsize,
    pub reasons: Mutex<Vec<String>>,
}

impl MetadataRefresher for MockRefresher {
    fn refresh(&self, _topics: &[String], _force: bool, reason: &str) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.reasons.lock().unwrap().push(reason.to_string());
    }
}

pub struct Harness {
    pub client: AdminClient,
    pub broker: Arc<MockBroker>,
    pub resolver: Arc<MockResolver>,
    pub refresher: Arc<MockRefresher>,
}

pub fn harness(config: AdminClientConfig) -> Harness {
    let broker = MockBroker::new();
    let resolver = Arc::new(MockResolver::default());
    let refresher = Arc::new(MockRefresher::default());
    let client = AdminClient::new(config, broker.clone(), resolver.clone(), refresher.clone())
        .expect("valid config");
    Harness {
        client,
        broker,
        resolver,
        refresher,
    }
}
