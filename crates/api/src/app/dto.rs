use serde::{Deserialize, Serialize};

use stockroom_core::BatchRef;

// -------------------------
// Response DTOs
// -------------------------

/// `POST /allocate` response; `batchref` is `null` when out of stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateResponse {
    pub batchref: Option<BatchRef>,
}
