/*!
Decoder for the binary records served by Riak's real-time replication queue.

Each queue fetch returns one opaque blob. [`Record::parse`] decodes a blob
into a [`Record`]: the bucket/key coordinates of the mutation, the vector
clocks, and the single sibling's value and metadata. Framing is positional
and CRC-validated; a record either decodes completely or fails with a
typed [`Error`] and no partial state.
*/

pub mod cursor;
pub mod error;
pub mod record;
pub mod vclock;

pub use error::Error;
pub use record::{Record, Value};
pub use vclock::{Format, VectorClocks};


#[cfg(test)]
mod record_tests;
