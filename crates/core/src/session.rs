//! Session-context codec.
//!
//! Slack gives a view exactly one opaque string (`private_metadata`) to carry
//! state across round trips, so the whole search session travels as a single
//! delimited tuple. Schema v1 is a `;`-joined string with this fixed field
//! order:
//!
//! ```text
//! channel_id;channel_name;message_ts;user_id;search_token;api_key;org_id
//! ```
//!
//! The position indices live only in this module; everything else works with
//! the named fields of [`SessionContext`]. Decoding pads missing trailing
//! fields as empty so an older string stays readable if a field is ever
//! appended. Field values must not contain the separator; Slack ids, message
//! timestamps, and platform tokens never do.

const FIELD_SEPARATOR: char = ';';

/// Channel name Slack reports for one-on-one conversations. Attaching a
/// result back into the source conversation is suppressed there.
pub const DIRECT_MESSAGE_CHANNEL_NAME: &str = "directmessage";

/// Per-view search session, round-tripped through `private_metadata`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub channel_id: String,
    pub channel_name: String,
    pub message_ts: String,
    pub user_id: String,
    pub search_token: String,
    pub api_key_override: String,
    pub org_id_override: String,
}

impl SessionContext {
    /// Context for an App Home view: no channel, no source message.
    pub fn app_home() -> Self {
        Self { channel_name: "App Home".to_owned(), ..Self::default() }
    }

    pub fn encode(&self) -> String {
        [
            self.channel_id.as_str(),
            self.channel_name.as_str(),
            self.message_ts.as_str(),
            self.user_id.as_str(),
            self.search_token.as_str(),
            self.api_key_override.as_str(),
            self.org_id_override.as_str(),
        ]
        .join(&FIELD_SEPARATOR.to_string())
    }

    pub fn decode(raw: &str) -> Self {
        let mut fields = raw.split(FIELD_SEPARATOR).map(str::to_owned);
        let mut next = || fields.next().unwrap_or_default();
        Self {
            channel_id: next(),
            channel_name: next(),
            message_ts: next(),
            user_id: next(),
            search_token: next(),
            api_key_override: next(),
            org_id_override: next(),
        }
    }

    /// Per-tenant credential overrides carried in the session string,
    /// resolved into a request-scoped value at the start of each interaction.
    pub fn tenant_overrides(&self) -> TenantOverrides {
        TenantOverrides {
            api_key: non_empty(&self.api_key_override),
            org_id: non_empty(&self.org_id_override),
        }
    }

    /// Attach-to-message needs a channel to post into. Sessions born in a
    /// direct message carry an empty channel id and never allow attaching.
    pub fn allows_attachment(&self) -> bool {
        !self.channel_id.is_empty()
    }
}

/// Request-scoped tenant credential overrides. A single deployed instance can
/// serve several organizations; the overrides ride in the session string and
/// are threaded explicitly through every search call instead of living in
/// shared mutable state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantOverrides {
    pub api_key: Option<String>,
    pub org_id: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_owned()) }
}

/// Analytics/cache identity for a Slack user: the user id reversed. An
/// obfuscation, not a cryptographic transform.
pub fn visitor_id(user_id: &str) -> String {
    user_id.chars().rev().collect()
}

pub fn is_direct_message(channel_name: &str) -> bool {
    channel_name == DIRECT_MESSAGE_CHANNEL_NAME
}

/// Referrer reported to the search and analytics backends for a channel.
pub fn channel_referrer(channel_name: &str) -> String {
    format!("https://slack.com/{channel_name}")
}
