use rw_schemas::EnforcementSnapshot;
use serde::{Deserialize, Serialize};

/// A change in on-chain enforcement state between two consecutive reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementTransition {
    MintingPaused,
    MintingResumed,
    MintingDisabled,
    MintingEnabled,
    HookUnwired,
    HookWired,
    ForwarderCleared,
    ForwarderSet,
    OnchainLost,
    OnchainRestored,
}

impl EnforcementTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementTransition::MintingPaused => "minting_paused",
            EnforcementTransition::MintingResumed => "minting_resumed",
            EnforcementTransition::MintingDisabled => "minting_disabled",
            EnforcementTransition::MintingEnabled => "minting_enabled",
            EnforcementTransition::HookUnwired => "hook_unwired",
            EnforcementTransition::HookWired => "hook_wired",
            EnforcementTransition::ForwarderCleared => "forwarder_cleared",
            EnforcementTransition::ForwarderSet => "forwarder_set",
            EnforcementTransition::OnchainLost => "onchain_lost",
            EnforcementTransition::OnchainRestored => "onchain_restored",
        }
    }

    /// Moves enforcement toward a worse state.
    pub fn is_adverse(&self) -> bool {
        matches!(
            self,
            EnforcementTransition::MintingPaused
                | EnforcementTransition::MintingDisabled
                | EnforcementTransition::HookUnwired
                | EnforcementTransition::ForwarderCleared
                | EnforcementTransition::OnchainLost
        )
    }
}

/// Compare two enforcement snapshots.
///
/// - No `previous` => no baseline, no transitions.
/// - Availability changes are reported alone; flags from a failed read are
///   never compared.
/// - A flag transitions only when both sides report an explicit value.
pub fn detect_transitions(
    previous: Option<&EnforcementSnapshot>,
    current: &EnforcementSnapshot,
) -> Vec<EnforcementTransition> {
    let Some(prev) = previous else {
        return Vec::new();
    };

    match (prev.is_available(), current.is_available()) {
        (true, false) => return vec![EnforcementTransition::OnchainLost],
        (false, true) => return vec![EnforcementTransition::OnchainRestored],
        (false, false) => return Vec::new(),
        (true, true) => {}
    }

    let mut out = Vec::new();
    let mut flag = |before: Option<bool>, after: Option<bool>, on_true, on_false| {
        if let (Some(b), Some(a)) = (before, after) {
            if b != a {
                out.push(if a { on_true } else { on_false });
            }
        }
    };

    flag(
        prev.minting_paused,
        current.minting_paused,
        EnforcementTransition::MintingPaused,
        EnforcementTransition::MintingResumed,
    );
    flag(
        prev.minting_enabled,
        current.minting_enabled,
        EnforcementTransition::MintingEnabled,
        EnforcementTransition::MintingDisabled,
    );
    flag(
        prev.hook_wired,
        current.hook_wired,
        EnforcementTransition::HookWired,
        EnforcementTransition::HookUnwired,
    );
    flag(
        prev.forwarder_set,
        current.forwarder_set,
        EnforcementTransition::ForwarderSet,
        EnforcementTransition::ForwarderCleared,
    );

    out
}
