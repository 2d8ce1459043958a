// storefront-core/src/order_id.rs

//! Business order-id tokens: `ORD-<unix-millis>-<9 base-36 chars>`.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Injectable id source used by the ledger. Must be callable concurrently.
pub type OrderIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

fn random_suffix() -> String {
  let mut rng = rand::thread_rng();
  (0..SUFFIX_LEN)
    .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
    .collect()
}

/// A fresh id stamped with the current time.
pub fn generate_order_id() -> String {
  order_id_at(Utc::now())
}

pub fn order_id_at(at: DateTime<Utc>) -> String {
  format!("ORD-{}-{}", at.timestamp_millis(), random_suffix())
}

/// Id for a legacy record repaired by the backfill: keeps the record's own
/// timestamp and adds its position in the repair batch.
pub fn backfill_order_id(created_at: DateTime<Utc>, index: usize) -> String {
  format!("ORD-{}-{:03}-{}", created_at.timestamp_millis(), index, random_suffix())
}

pub fn default_generator() -> OrderIdGenerator {
  Arc::new(generate_order_id)
}
