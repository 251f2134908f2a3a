//! Error-action classification.
//!
//! Every error code a request can end with maps to an [`ErrorAction`]: a set
//! of things the dispatcher should do about it (refresh metadata, retry,
//! give up). Lookup goes through the operation's own table first, then the
//! universal table, and anything still unmapped is permanent.
//!
//! The tables are plain `static` data and need no synchronization.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use super::ApiKey;
use crate::error::{Error, KafkaCode};

/// Bit set of actions to take for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorAction(u32);

impl ErrorAction {
    pub const NONE: Self = ErrorAction(0);
    /// Do not retry; surface the error.
    pub const PERMANENT: Self = ErrorAction(0x1);
    /// The error can be ignored.
    pub const IGNORE: Self = ErrorAction(0x2);
    /// Refresh cluster metadata (leader, controller, coordinator).
    pub const REFRESH: Self = ErrorAction(0x4);
    /// Retry the request.
    pub const RETRY: Self = ErrorAction(0x8);
    /// Surface the error to the application even if handled.
    pub const INFORM: Self = ErrorAction(0x10);
    /// Unrecoverable for the whole client.
    pub const FATAL: Self = ErrorAction(0x200);

    const NAMES: &'static [(ErrorAction, &'static str)] = &[
        (Self::PERMANENT, "Permanent"),
        (Self::IGNORE, "Ignore"),
        (Self::REFRESH, "Refresh"),
        (Self::RETRY, "Retry"),
        (Self::INFORM, "Inform"),
        (Self::FATAL, "Fatal"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ErrorAction) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: ErrorAction) -> Self {
        ErrorAction(self.0 | other.0)
    }

    pub const fn without(self, other: ErrorAction) -> Self {
        ErrorAction(self.0 & !other.0)
    }

    pub const fn is_retriable(self) -> bool {
        self.contains(Self::RETRY)
    }

    pub const fn needs_refresh(self) -> bool {
        self.contains(Self::REFRESH)
    }

    /// Apply precedence: FATAL beats PERMANENT, and either strips RETRY.
    pub const fn resolve(self) -> Self {
        if self.contains(Self::FATAL) {
            self.without(Self::PERMANENT).without(Self::RETRY)
        } else if self.contains(Self::PERMANENT) {
            self.without(Self::RETRY)
        } else {
            self
        }
    }
}

impl BitOr for ErrorAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ErrorAction {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for ErrorAction {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        ErrorAction(self.0 & rhs.0)
    }
}

impl fmt::Display for ErrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(*flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

type ActionTable = &'static [(KafkaCode, ErrorAction)];

const REFRESH_RETRY: ErrorAction = ErrorAction::REFRESH.union(ErrorAction::RETRY);

// =============================================================================
// Per-operation tables
// =============================================================================

static LIST_OFFSETS_ACTIONS: ActionTable = &[
    (KafkaCode::UnknownTopicOrPartition, ErrorAction::PERMANENT),
    (KafkaCode::NotLeaderForPartition, ErrorAction::REFRESH),
    (KafkaCode::ReplicaNotAvailable, ErrorAction::REFRESH),
    (KafkaCode::KafkaStorageError, ErrorAction::REFRESH),
    (KafkaCode::OffsetNotAvailable, REFRESH_RETRY),
    (KafkaCode::LeaderNotAvailable, REFRESH_RETRY),
    (KafkaCode::FencedLeaderEpoch, REFRESH_RETRY),
    (KafkaCode::UnknownLeaderEpoch, REFRESH_RETRY),
    (KafkaCode::Transport, ErrorAction::RETRY),
    (KafkaCode::RequestTimedOut, ErrorAction::RETRY),
];

/// Controller-routed topic operations. A broker-side RequestTimedOut means
/// the operation may still complete, so it is reported instead of retried.
static TOPIC_ACTIONS: ActionTable = &[
    (KafkaCode::NotController, REFRESH_RETRY),
    (
        KafkaCode::RequestTimedOut,
        ErrorAction::PERMANENT.union(ErrorAction::INFORM),
    ),
    (KafkaCode::TopicAlreadyExists, ErrorAction::PERMANENT),
    (KafkaCode::UnknownTopicOrPartition, ErrorAction::PERMANENT),
    (KafkaCode::ThrottlingQuotaExceeded, ErrorAction::RETRY),
];

static ACL_ACTIONS: ActionTable = &[
    (KafkaCode::SecurityDisabled, ErrorAction::PERMANENT),
    (KafkaCode::ClusterAuthorizationFailed, ErrorAction::PERMANENT),
];

static GROUP_ACTIONS: ActionTable = &[
    (KafkaCode::GroupIdNotFound, ErrorAction::PERMANENT),
    (KafkaCode::NonEmptyGroup, ErrorAction::PERMANENT),
    (KafkaCode::GroupSubscribedToTopic, ErrorAction::PERMANENT),
    (KafkaCode::GroupAuthorizationFailed, ErrorAction::PERMANENT),
];

static SCRAM_ACTIONS: ActionTable = &[
    (KafkaCode::NotController, REFRESH_RETRY),
    (KafkaCode::ResourceNotFound, ErrorAction::PERMANENT),
    (KafkaCode::DuplicateResource, ErrorAction::PERMANENT),
    (KafkaCode::UnacceptableCredential, ErrorAction::PERMANENT),
    (KafkaCode::UnsupportedSaslMechanism, ErrorAction::PERMANENT),
];

// =============================================================================
// Universal fallback
// =============================================================================

static UNIVERSAL_ACTIONS: ActionTable = &[
    (KafkaCode::Transport, ErrorAction::RETRY),
    // a response that failed to decode is treated like a lost connection
    (KafkaCode::BadMsg, ErrorAction::RETRY),
    (KafkaCode::NetworkException, ErrorAction::RETRY),
    (KafkaCode::RequestTimedOut, ErrorAction::RETRY),
    (KafkaCode::NotLeaderForPartition, ErrorAction::REFRESH),
    (KafkaCode::LeaderNotAvailable, REFRESH_RETRY),
    (KafkaCode::BrokerNotAvailable, REFRESH_RETRY),
    (KafkaCode::NotController, REFRESH_RETRY),
    (KafkaCode::NotCoordinatorForGroup, REFRESH_RETRY),
    (KafkaCode::GroupCoordinatorNotAvailable, REFRESH_RETRY),
    (KafkaCode::GroupLoadInProgress, ErrorAction::RETRY),
];

fn table_for(api_key: ApiKey) -> ActionTable {
    match api_key {
        ApiKey::ListOffsets => LIST_OFFSETS_ACTIONS,
        ApiKey::CreateTopics | ApiKey::DeleteTopics | ApiKey::CreatePartitions => TOPIC_ACTIONS,
        ApiKey::CreateAcls | ApiKey::DescribeAcls | ApiKey::DeleteAcls => ACL_ACTIONS,
        ApiKey::DeleteGroups | ApiKey::OffsetDelete => GROUP_ACTIONS,
        ApiKey::DescribeUserScramCredentials | ApiKey::AlterUserScramCredentials => SCRAM_ACTIONS,
        _ => &[],
    }
}

fn lookup(table: ActionTable, code: KafkaCode) -> Option<ErrorAction> {
    table.iter().find(|(c, _)| *c == code).map(|(_, a)| *a)
}

/// Classify `code` as returned by `api_key`.
pub fn classify(api_key: ApiKey, code: KafkaCode) -> ErrorAction {
    if code == KafkaCode::None {
        return ErrorAction::NONE;
    }
    lookup(table_for(api_key), code)
        .or_else(|| lookup(UNIVERSAL_ACTIONS, code))
        .unwrap_or(ErrorAction::PERMANENT)
        .resolve()
}

/// Classify a request-level error.
pub fn classify_error(api_key: ApiKey, error: &Error) -> ErrorAction {
    classify(api_key, error.code())
}
