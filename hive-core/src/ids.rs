//! Object identity for persisted metadata entities

/// Row id of a persisted metadata entity.
pub type ObjectId = i32;

/// Sentinel id meaning "not yet persisted".
///
/// Gateways overwrite this on insert; any update/delete/lookup receiving it
/// is a persistence error.
pub const NEW_OBJECT_ID: ObjectId = 0;

/// True once a gateway has assigned a real id.
pub fn is_persisted(id: ObjectId) -> bool {
    id != NEW_OBJECT_ID
}
