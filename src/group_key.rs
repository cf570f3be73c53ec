//! stable identity of an alert group
//!
//! The key is written to the incident and used to find it again on the next
//! notification of the same group, so it must not depend on the order in which
//! alertmanager serialized the labels.

use crate::alert::LabelSet;

/// label pairs sorted by name
pub fn sorted_pairs(labels: &LabelSet) -> Vec<(&str, &str)> {
	let mut pairs: Vec<_> = labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
	pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
	pairs
}

/// renders the group labels as `name: value` pairs sorted by name and joined
/// with `", "`
pub fn derive_group_key(group_labels: &LabelSet) -> String {
	sorted_pairs(group_labels)
		.into_iter()
		.map(|(name, value)| format!("{name}: {value}"))
		.collect::<Vec<_>>()
		.join(", ")
}
