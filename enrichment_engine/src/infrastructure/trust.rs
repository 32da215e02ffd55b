//! Trust validator (§4.6). Pure function over a descriptor and a policy —
//! no I/O, no mutable state, grounded structurally on the teacher's
//! `validate_configuration`-style pure validators in
//! `repositories/stage_executor.rs`.

use enrichment_domain::entities::{ComponentDescriptor, TrustLevel, TrustPolicy};
use enrichment_domain::services::TrustValidator;

pub struct PolicyTrustValidator;

impl TrustValidator for PolicyTrustValidator {
    fn classify(&self, descriptor: &ComponentDescriptor, policy: &TrustPolicy) -> TrustLevel {
        if policy.blocked_list.contains(&descriptor.source_url) {
            return TrustLevel::Blocked;
        }

        let in_allow_list = policy.allow_list.contains(&descriptor.source_url);
        if !in_allow_list {
            return TrustLevel::Unverified;
        }

        let scheme_ok = match policy.required_scheme(descriptor.kind) {
            Some(required) => descriptor
                .source_url
                .split_once("://")
                .map(|(scheme, _)| scheme.eq_ignore_ascii_case(required))
                .unwrap_or(false),
            None => true,
        };

        let checksum_ok = if policy.checksum_required {
            descriptor.checksum.is_some()
        } else {
            true
        };

        if checksum_ok && scheme_ok {
            TrustLevel::Trusted
        } else if !checksum_ok {
            TrustLevel::Untrusted
        } else {
            // allow-listed, checksum fine, but wrong scheme: conservative
            // rejection rather than a level the policy never asked about.
            TrustLevel::Untrusted
        }
    }
}
