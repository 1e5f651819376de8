use thiserror::Error;

/// Input-validation failures. The engine performs no IO, so these are the
/// only ways a call can fail; any one of them aborts the whole call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("malformed purchase record {record}: missing required field `{field}`")]
    MissingField { record: String, field: &'static str },

    #[error("malformed purchase record {record}: item {position} has negative price {price_micros}")]
    NegativePrice {
        record: String,
        position: usize,
        price_micros: i64,
    },

    #[error("malformed purchase record {record}: negative recorded amount {amount_micros}")]
    NegativeAmount { record: String, amount_micros: i64 },

    #[error("malformed purchase record {record}: item prices overflow the order total")]
    TotalOverflow { record: String },

    #[error("unknown {field} value `{value}`")]
    UnknownValue { field: &'static str, value: String },
}
