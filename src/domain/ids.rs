use crate::{infra::ClientError, uuid_id};

uuid_id!(CartId);
uuid_id!(OrderId);
uuid_id!(ProductId);
uuid_id!(ReviewId);
uuid_id!(SessionCartId);
uuid_id!(UserId);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Uuid {0} is not compatible. Version 7 Uuid is required.")]
pub struct UuidNotCompatible(pub uuid::Uuid);

impl From<UuidNotCompatible> for ClientError {
    fn from(value: UuidNotCompatible) -> Self {
        ClientError::Validation(value.to_string())
    }
}
