//! The message an account owner signs to authorize a migration.

const BYTES_PREFIX: &[u8] = b"<Bytes>";
const BYTES_SUFFIX: &[u8] = b"</Bytes>";

/// `spec_name` is the destination runtime (e.g. `darwinia2`); the legacy
/// chain name is the spec name without its trailing version digit.
pub fn authorization_message(to: &str, spec_name: &str) -> String {
    let mut old_chain_name = spec_name.chars();
    old_chain_name.next_back();
    format!(
        "I authorize the migration to {}, an unused address on {}. Sign this message to \
         authorize using the Substrate key associated with the account on {} that you wish \
         to migrate.",
        to.to_lowercase(),
        spec_name,
        old_chain_name.as_str(),
    )
}

/// Wraps raw bytes the same way browser extensions do before signing, so
/// the runtime can tell a signed message apart from a signed extrinsic.
pub fn wrap_bytes(message: &[u8]) -> Vec<u8> {
    if message.starts_with(BYTES_PREFIX) && message.ends_with(BYTES_SUFFIX) {
        return message.to_vec();
    }
    let mut out = Vec::with_capacity(BYTES_PREFIX.len() + message.len() + BYTES_SUFFIX.len());
    out.extend_from_slice(BYTES_PREFIX);
    out.extend_from_slice(message);
    out.extend_from_slice(BYTES_SUFFIX);
    out
}
