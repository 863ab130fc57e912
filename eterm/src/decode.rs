/*!
A decoder for the Erlang external term format.

This module parses byte slices produced by Erlang's `term_to_binary/1`
(format version 131) into a [`Term`] value. Only the tags that occur in
Riak replication records are supported: integers (including the small
bignum form), atoms, tuples, lists, strings and binaries.

# Usage

```
use replsink_eterm::decode::{self, Term};

// term_to_binary({1, <<"ab">>})
let bytes = &[0x83, 0x68, 0x02, 0x61, 0x01, 0x6d, 0x00, 0x00, 0x00, 0x02, 0x61, 0x62];

let term = decode::parse(bytes).unwrap();
assert_eq!(
    term,
    Term::Tuple(vec![Term::Int(1), Term::Binary(b"ab".to_vec().into())])
);
```
*/

use thiserror::Error;

const FORMAT_VERSION: u8 = 131;

const SMALL_INTEGER_EXT: u8 = 97;
const INTEGER_EXT: u8 = 98;
const ATOM_EXT: u8 = 100;
const SMALL_TUPLE_EXT: u8 = 104;
const LARGE_TUPLE_EXT: u8 = 105;
const NIL_EXT: u8 = 106;
const STRING_EXT: u8 = 107;
const LIST_EXT: u8 = 108;
const BINARY_EXT: u8 = 109;
const SMALL_BIG_EXT: u8 = 110;
const SMALL_ATOM_EXT: u8 = 115;
const ATOM_UTF8_EXT: u8 = 118;
const SMALL_ATOM_UTF8_EXT: u8 = 119;

/// Nesting limit for tuples and lists.
const MAX_RECURSION: usize = 64;

/// An error that can occur during term decoding.
#[derive(Error, Debug)]
pub enum Error {
    /// The input data is incomplete and more bytes are needed to decode the term.
    #[error("Need at least {0} more bytes to decode term")]
    NeedMoreData(usize),

    /// The leading version byte is not the supported format version (131).
    #[error("Unsupported term format version {0}")]
    InvalidVersion(u8),

    /// The term carries a tag outside the supported subset.
    #[error("Unsupported term tag {0}")]
    UnknownTag(u8),

    /// The input contains extra bytes after the end of the term.
    #[error("{0} bytes of additional data after term")]
    AdditionalData(usize),

    /// An integer value does not fit a 64-bit signed integer.
    #[error("Integer does not fit a 64-bit signed value")]
    IntegerOverflow,

    /// An atom name is not valid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] core::str::Utf8Error),

    /// The maximum recursion depth was reached while decoding nested terms.
    #[error("Maximum recursion depth reached")]
    MaxRecursion,
}

/// A single decoded Erlang term.
///
/// Strings decode to lists of integers, which is what they are in the
/// term format; proper lists decode to [`Term::List`] with the nil tail
/// dropped, and an improper tail is kept as a final element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Int(i64),
    Atom(String),
    Binary(Box<[u8]>),
    Tuple(Vec<Term>),
    List(Vec<Term>),
}

impl Term {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Term::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Term::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(l) => Some(l),
            _ => None,
        }
    }
}

/// Decodes a single term from a byte slice.
///
/// The slice must begin with the format version byte and must contain
/// exactly one term; trailing bytes are an error.
pub fn parse(data: &[u8]) -> Result<Term, Error> {
    let Some(version) = data.first() else {
        return Err(Error::NeedMoreData(1));
    };
    if *version != FORMAT_VERSION {
        return Err(Error::InvalidVersion(*version));
    }

    let (term, len) = parse_term(&data[1..], MAX_RECURSION)?;
    if len + 1 != data.len() {
        return Err(Error::AdditionalData(data.len() - len - 1));
    }
    Ok(term)
}

fn to_array<const N: usize>(data: &[u8]) -> Result<[u8; N], Error> {
    match data.len().cmp(&N) {
        core::cmp::Ordering::Less => Err(Error::NeedMoreData(N - data.len())),
        _ => Ok(data[0..N].try_into().unwrap()),
    }
}

fn take(data: &[u8], len: usize) -> Result<&[u8], Error> {
    data.get(0..len)
        .ok_or_else(|| Error::NeedMoreData(len - data.len()))
}

fn parse_big(digits: &[u8], sign: u8) -> Result<i64, Error> {
    let mut value: u64 = 0;
    for (i, b) in digits.iter().enumerate() {
        if *b != 0 {
            if i >= 8 {
                return Err(Error::IntegerOverflow);
            }
            value |= u64::from(*b) << (8 * i);
        }
    }
    let value = i64::try_from(value).map_err(|_| Error::IntegerOverflow)?;
    Ok(if sign != 0 { -value } else { value })
}

fn parse_elements(
    data: &[u8],
    count: usize,
    max_recursion: usize,
) -> Result<(Vec<Term>, usize), Error> {
    if max_recursion == 0 {
        return Err(Error::MaxRecursion);
    }
    let mut elements = Vec::with_capacity(count.min(256));
    let mut offset = 0;
    for _ in 0..count {
        let (element, len) = parse_term(&data[offset..], max_recursion - 1)?;
        elements.push(element);
        offset += len;
    }
    Ok((elements, offset))
}

fn parse_term(data: &[u8], max_recursion: usize) -> Result<(Term, usize), Error> {
    let Some(tag) = data.first() else {
        return Err(Error::NeedMoreData(1));
    };
    let data = &data[1..];

    match *tag {
        SMALL_INTEGER_EXT => {
            let [v] = to_array(data)?;
            Ok((Term::Int(v.into()), 2))
        }
        INTEGER_EXT => {
            let v = i32::from_be_bytes(to_array(data)?);
            Ok((Term::Int(v.into()), 5))
        }
        SMALL_BIG_EXT => {
            let [n, sign] = to_array(data)?;
            let digits = take(&data[2..], n as usize)?;
            Ok((Term::Int(parse_big(digits, sign)?), 3 + n as usize))
        }
        ATOM_EXT | ATOM_UTF8_EXT => {
            let len = u16::from_be_bytes(to_array(data)?) as usize;
            let name = take(&data[2..], len)?;
            Ok((
                Term::Atom(core::str::from_utf8(name)?.to_string()),
                3 + len,
            ))
        }
        SMALL_ATOM_EXT | SMALL_ATOM_UTF8_EXT => {
            let [len] = to_array(data)?;
            let name = take(&data[1..], len as usize)?;
            Ok((
                Term::Atom(core::str::from_utf8(name)?.to_string()),
                2 + len as usize,
            ))
        }
        SMALL_TUPLE_EXT => {
            let [arity] = to_array(data)?;
            let (elements, len) = parse_elements(&data[1..], arity as usize, max_recursion)?;
            Ok((Term::Tuple(elements), 2 + len))
        }
        LARGE_TUPLE_EXT => {
            let arity = u32::from_be_bytes(to_array(data)?) as usize;
            let (elements, len) = parse_elements(&data[4..], arity, max_recursion)?;
            Ok((Term::Tuple(elements), 5 + len))
        }
        NIL_EXT => Ok((Term::List(Vec::new()), 1)),
        STRING_EXT => {
            let len = u16::from_be_bytes(to_array(data)?) as usize;
            let chars = take(&data[2..], len)?;
            Ok((
                Term::List(chars.iter().map(|c| Term::Int((*c).into())).collect()),
                3 + len,
            ))
        }
        LIST_EXT => {
            if max_recursion == 0 {
                return Err(Error::MaxRecursion);
            }
            let count = u32::from_be_bytes(to_array(data)?) as usize;
            let (mut elements, len) = parse_elements(&data[4..], count, max_recursion)?;
            let (tail, tail_len) = parse_term(&data[4 + len..], max_recursion - 1)?;
            if !matches!(&tail, Term::List(l) if l.is_empty()) {
                // Improper tail, kept as a trailing element
                elements.push(tail);
            }
            Ok((Term::List(elements), 5 + len + tail_len))
        }
        BINARY_EXT => {
            let len = u32::from_be_bytes(to_array(data)?) as usize;
            let bytes = take(&data[4..], len)?;
            Ok((Term::Binary(bytes.to_vec().into()), 5 + len))
        }
        tag => Err(Error::UnknownTag(tag)),
    }
}
