/// Commands buffered between the HTTP intake and the ledger actor.
pub(crate) const COMMAND_BUFFER: usize = 1024;
/// New-block notifications kept for slow event subscribers.
pub(crate) const EVENT_BUFFER: usize = 64;
pub(crate) const DEFAULT_REWARD_ADDRESS: &str = "adam";
