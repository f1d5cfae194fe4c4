//! Proxy transparency classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostics::snapshot::RequestSnapshot;

/// How much a proxy reveals about the client behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymityLevel {
    /// Forwards hop or origin information.
    Transparent,
    /// Hides the client but changes the visible address.
    Anonymous,
    /// No sign of proxying at all.
    Elite,
}

impl AnonymityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnonymityLevel::Transparent => "transparent",
            AnonymityLevel::Anonymous => "anonymous",
            AnonymityLevel::Elite => "elite",
        }
    }
}

impl fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the proxy a request came through.
///
/// `reference_address` is the proxy address under test. The first rule that
/// matches wins:
/// 1. `Via` present, or `X-Forwarded-For` present and different from the
///    connecting address: [`AnonymityLevel::Transparent`]
/// 2. a reference address that differs from the connecting address:
///    [`AnonymityLevel::Anonymous`]
/// 3. otherwise [`AnonymityLevel::Elite`]
pub fn classify(snapshot: &RequestSnapshot, reference_address: Option<&str>) -> AnonymityLevel {
    let connecting = snapshot.connecting_address.as_str();

    let leaks_forwarding = snapshot
        .forwarded_for()
        .is_some_and(|forwarded| forwarded != connecting);
    if snapshot.via().is_some() || leaks_forwarding {
        return AnonymityLevel::Transparent;
    }

    if reference_address.is_some_and(|reference| !reference.is_empty() && reference != connecting) {
        return AnonymityLevel::Anonymous;
    }

    AnonymityLevel::Elite
}
