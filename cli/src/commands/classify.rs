use accord_common::session::PeerDescription;
use accord_core::classifier::{MatcherRegistry, VersionClassifier};
use colored::*;

use crate::terminal::{colors, print};

pub fn classify(version: &str, peer_type: &str) -> anyhow::Result<()> {
    let classifier = VersionClassifier::new(MatcherRegistry::standard());
    let module = classifier.resolve(&PeerDescription::new(version, peer_type))?;

    print::set_key_width(&["Module", "Protocol", "Inventory", "Extended"]);
    print::aligned_line("Module", module.to_string().color(colors::ACCENT));
    print::aligned_line("Protocol", module.revision.protocol_version().to_string());
    print::aligned_line("Inventory", yes_no(module.manages_inventory()));
    print::aligned_line("Extended", yes_no(module.supports_extended_queries()));
    Ok(())
}

fn yes_no(flag: bool) -> ColoredString {
    if flag { "yes".green() } else { "no".bright_black() }
}
