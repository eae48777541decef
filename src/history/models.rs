use crate::openai::Role;

/// One stored line of a conversation, either side of an exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchange {
    pub role: Role,
    pub content: String,
}
