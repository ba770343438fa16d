//! Decoding of the persisted synthesis blob.
//!
//! Two encodings coexist in stored messages:
//!
//! ```text
//! legacy:  [{"agentId": 1, "contribution": "..."}, ...]
//! current: {"style": "debate", "agentContributions": [...]}
//! ```
//!
//! Anything that does not decode, or decodes to zero contributions, means
//! the message is a plain assistant reply.

use serde::{Deserialize, Deserializer, Serialize};
use tutor_types::{
    Result,
    message::{AgentContribution, CollaborationStyle, CollaborativeInfo, Message, Role},
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SynthesisBlob {
    LegacyArray(Vec<AgentContribution>),
    CurrentObject(CurrentBlob),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentBlob {
    #[serde(default, deserialize_with = "lenient_style")]
    style: CollaborationStyle,
    #[serde(default)]
    agent_contributions: Vec<AgentContribution>,
}

/// Unknown or null styles fall back to parallel rather than failing the blob.
fn lenient_style<'de, D>(deserializer: D) -> std::result::Result<CollaborationStyle, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

impl From<SynthesisBlob> for CollaborativeInfo {
    fn from(blob: SynthesisBlob) -> Self {
        match blob {
            SynthesisBlob::LegacyArray(agent_contributions) => CollaborativeInfo {
                style: CollaborationStyle::Parallel,
                agent_contributions,
            },
            SynthesisBlob::CurrentObject(current) => CollaborativeInfo {
                style: current.style,
                agent_contributions: current.agent_contributions,
            },
        }
    }
}

/// Decode a raw synthesis blob. Never fails; `None` means "not collaborative".
pub fn decode_synthesis(raw: &str) -> Option<CollaborativeInfo> {
    let blob: SynthesisBlob = match serde_json::from_str(raw) {
        Ok(blob) => blob,
        Err(e) => {
            log::debug!("Ignoring undecodable synthesis blob: {}", e);
            return None;
        }
    };
    let info = CollaborativeInfo::from(blob);
    if info.agent_contributions.is_empty() {
        return None;
    }
    Some(info)
}

/// Collaborative data of a stored message, if it carries any.
pub fn decode_message(msg: &Message) -> Option<CollaborativeInfo> {
    if msg.role != Role::Assistant {
        return None;
    }
    msg.synthesized_from.as_deref().and_then(decode_synthesis)
}

/// Encode in the current object shape
pub fn encode_current(info: &CollaborativeInfo) -> Result<String> {
    let blob = CurrentBlob {
        style: info.style,
        agent_contributions: info.agent_contributions.clone(),
    };
    Ok(serde_json::to_string(&blob)?)
}

/// Encode in the legacy bare-array shape. The style is not representable.
pub fn encode_legacy(contributions: &[AgentContribution]) -> Result<String> {
    Ok(serde_json::to_string(contributions)?)
}
