/// Who is performing the request, as recorded on ledger entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: String,
}

impl ActorContext {
    pub const DEFAULT_ACTOR: &'static str = "system";

    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl Default for ActorContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ACTOR)
    }
}
