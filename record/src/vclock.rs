/*!
Vector clock output formats.

The clock bytes inside a record are an encoded Erlang term:
`[{Actor, {Counter, Timestamp}}, ...]`. Consumers that only forward the
clocks keep them opaque as base64; consumers that reason about causality
ask for the actor → counter map instead. The format is selected once, in
configuration, and applies to every record the decoder produces.
*/

use crate::error::Error;
use base64::prelude::*;
use replsink_eterm::decode::{self, Term};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Output format for vector clocks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    /// The raw clock bytes, base64 encoded.
    #[default]
    Base64,
    /// A mapping of actor id to per-actor update counter.
    Dict,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(Format::Base64),
            "dict" => Ok(Format::Dict),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

/// Decoded vector clocks, in the representation selected by [`Format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorClocks {
    Base64(String),
    Dict(BTreeMap<String, u64>),
}

impl VectorClocks {
    pub(crate) fn parse(raw: &[u8], format: Format) -> Result<Self, Error> {
        match format {
            Format::Base64 => Ok(VectorClocks::Base64(BASE64_STANDARD.encode(raw))),
            Format::Dict => Ok(VectorClocks::Dict(parse_dict(raw)?)),
        }
    }
}

fn parse_dict(raw: &[u8]) -> Result<BTreeMap<String, u64>, Error> {
    let term = decode::parse(raw)?;
    let entries = term
        .as_list()
        .ok_or(Error::InvalidVectorClocks("expected a list of actor entries"))?;

    let mut clocks = BTreeMap::new();
    for entry in entries {
        let entry = entry
            .as_tuple()
            .filter(|t| t.len() == 2)
            .ok_or(Error::InvalidVectorClocks("actor entry is not a 2-tuple"))?;
        let actor = entry[0]
            .as_binary()
            .ok_or(Error::InvalidVectorClocks("actor id is not a binary"))?;
        let counter = entry[1]
            .as_tuple()
            .and_then(|counts| counts.first())
            .and_then(Term::as_int)
            .ok_or(Error::InvalidVectorClocks("actor entry has no counter"))?;
        let counter = u64::try_from(counter)
            .map_err(|_| Error::InvalidVectorClocks("actor counter is negative"))?;
        clocks.insert(actor_key(actor), counter);
    }
    Ok(clocks)
}

// BINARY_EXT, the term tag an actor id is encoded under.
const ACTOR_TAG: u8 = 109;

/// Renders an actor id as the decimal concatenation of the bytes of its
/// term encoding: tag byte, 4-byte big-endian length, then the payload.
/// Downstream tables key on this exact string form.
fn actor_key(actor: &[u8]) -> String {
    let mut key = String::with_capacity((actor.len() + 5) * 3);
    for b in core::iter::once(ACTOR_TAG)
        .chain((actor.len() as u32).to_be_bytes())
        .chain(actor.iter().copied())
    {
        key.push_str(&b.to_string());
    }
    key
}
