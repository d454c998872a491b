//! Protocol selection for a mirror.

use crate::config::ProtocolPolicy;
use crate::manifest::{MirrorDescriptor, ProtocolType};

/// Outcome of choosing which of a mirror's addresses to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolSelection<'a> {
    Selected {
        protocol: ProtocolType,
        url: &'a str,
    },
    /// The mirror has no address with any acceptable protocol.
    NoMatchingProtocol,
}

/// Pick the address to probe under `policy`.
pub fn select_protocol<'a>(
    mirror: &'a MirrorDescriptor,
    required_protocols: &[ProtocolType],
    policy: ProtocolPolicy,
) -> ProtocolSelection<'a> {
    let selected = match policy {
        ProtocolPolicy::ManifestPriority => required_protocols
            .iter()
            .find_map(|protocol| mirror.url_for(*protocol).map(|url| (*protocol, url))),
        ProtocolPolicy::DescriptorOrder => mirror
            .urls
            .iter()
            .find(|(protocol, _)| required_protocols.contains(protocol))
            .map(|(protocol, url)| (*protocol, url.as_str())),
    };

    match selected {
        Some((protocol, url)) => ProtocolSelection::Selected { protocol, url },
        None => ProtocolSelection::NoMatchingProtocol,
    }
}
