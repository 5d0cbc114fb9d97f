// SPDX-License-Identifier: MIT OR Apache-2.0
//! FQDN decoding with the two-label TLD rule.
//!
//! The host is taken from the token after stripping a `scheme://` prefix and
//! anything from the first `'/'`. Hosts longer than 253 bytes, labels longer
//! than 63 bytes, and bytes outside `[A-Za-z0-9.-]` are rejected; rejected
//! tokens are consumed without emitting fields.
//!
//! TLD detection: the last label is a second-level TLD part when it has at
//! most 2 bytes, the label before it has at most 3, and at least three
//! labels exist (`shop.example.com.ar` → `com.ar`); otherwise the last label alone
//! is the TLD when it has at most 3 bytes (`example.com` → `com`); otherwise
//! there is no TLD (`www.intranet` → none).

use super::{Decoded, DecodeFail, scan_token};
use crate::value::Value;

const MAX_HOST_BYTES: usize = 253;
const MAX_LABEL_BYTES: usize = 63;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
    fqdn: bool,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = scan_token(input, cursor, stop);

    let Some(parts) = split(token, fqdn) else {
        return Ok(Decoded::Silent { end });
    };

    Ok(Decoded::Fields {
        fields: vec![
            (Some("subdomain"), Value::Str(parts.subdomain)),
            (Some("registered_domain"), Value::Str(parts.registered)),
            (Some("top_level_domain"), Value::Str(parts.tld)),
        ],
        end,
    })
}

struct DomainParts {
    subdomain: String,
    registered: String,
    tld: String,
}

fn split(token: &str, fqdn: bool) -> Option<DomainParts> {
    let host = host_of(token);
    if host.is_empty()
        || host.len() > MAX_HOST_BYTES
        || !host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.iter().any(|l| l.len() > MAX_LABEL_BYTES) {
        return None;
    }

    let n = labels.len();
    let tld_labels = if n >= 3 && labels[n - 1].len() <= 2 && labels[n - 2].len() <= 3 {
        2
    } else if n >= 2 && labels[n - 1].len() <= 3 {
        1
    } else {
        0
    };
    let registered_idx = n - tld_labels - 1;

    let parts = DomainParts {
        subdomain: labels[..registered_idx].join("."),
        registered: labels[registered_idx..].join("."),
        tld: labels[n - tld_labels..].join("."),
    };

    if fqdn && (parts.subdomain.is_empty() || parts.tld.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Strip a `scheme://` prefix and any path from the token.
fn host_of(token: &str) -> &str {
    let after_scheme = token
        .find("://")
        .map_or(token, |idx| &token[idx + "://".len()..]);
    after_scheme
        .find('/')
        .map_or(after_scheme, |idx| &after_scheme[..idx])
}
