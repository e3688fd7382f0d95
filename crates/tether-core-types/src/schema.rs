//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Schema identifiers
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_RELATIONSHIP: &str = "relationship";
pub const FIELD_PATH: &str = "path";

// Collection sizes
pub const FIELD_ROOT_COUNT: &str = "root_count";
pub const FIELD_MATCH_COUNT: &str = "match_count";
pub const FIELD_QUERY_COUNT: &str = "query_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Operation names
pub const OP_LOAD: &str = "load";
pub const OP_HYDRATE: &str = "hydrate";
pub const OP_SYNC_SCHEMA: &str = "sync_schema";
pub const OP_DROP_ALL: &str = "drop_all";
pub const OP_IMPORT_SEED: &str = "import_seed";
