use crate::db_types::Operation;

/// The result of an insert-if-absent write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOperationResult {
    /// The record did not exist and has been written.
    Inserted(Operation),
    /// A record with the same id already existed. It is returned unchanged.
    AlreadyExists(Operation),
}

impl InsertOperationResult {
    pub fn operation(&self) -> &Operation {
        match self {
            Self::Inserted(op) | Self::AlreadyExists(op) => op,
        }
    }

    pub fn into_operation(self) -> Operation {
        match self {
            Self::Inserted(op) | Self::AlreadyExists(op) => op,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}
