/*!
DynamoDB sink for replicated Riak records.

One [`Table`] wraps one DynamoDB table. Decoded records are applied with
conditional writes on the `_riak_lm` attribute so replays and out-of-order
deliveries resolve last-writer-wins without a read-before-write.
*/

mod config;
mod item;
mod table;

pub mod error;

pub use config::Config;
pub use error::Error;
pub use table::Table;
