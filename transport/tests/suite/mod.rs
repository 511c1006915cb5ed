// Aggregates all former standalone integration tests as modules.
mod client;
mod reqwest_tier;
mod sequencer;
