// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `contacts_relay_flow_total{flow, outcome}` when the `metrics` feature is on.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		let (flow, outcome) = (kind.as_str(), outcome.as_str());

		metrics::counter!("contacts_relay_flow_total", "flow" => flow, "outcome" => outcome)
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records one upstream contacts page and how many records it carried.
pub fn record_contacts_page(records: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("contacts_relay_pages_total").increment(1);
		metrics::counter!("contacts_relay_records_total").increment(records as u64);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = records;
}
